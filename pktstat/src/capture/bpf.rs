//! # BPF Compiler
//!
//! Compiles a tcpdump-style filter expression into a classic BPF program that
//! can be attached to a capture socket (`SO_ATTACH_FILTER`).
//!
//! libpcap does the compilation against a dead handle of the right link type.
//! Its instructions are read back through their textual form (`code jt jf k`)
//! so the result is a plain owned `Vec` with no libpcap lifetime attached.
//!
//! Accepting returns (`ret #k`, `k != 0`) are clamped to the snapshot length:
//! the kernel truncates each delivered frame to the value returned.

use pcap::{Capture, Linktype};

use crate::decode::LinkType;
use crate::domain::CaptureError;

/// `BPF_RET | BPF_K`
const BPF_RET_K: u16 = 0x06;

/// One classic BPF instruction, laid out like `struct sock_filter`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BpfInstruction {
    pub code: u16,
    pub jt: u8,
    pub jf: u8,
    pub k: u32,
}

/// Compile `filter` for frames of `link` type.
///
/// # Errors
/// [`CaptureError::InvalidFilter`] carrying libpcap's message if the
/// expression does not compile.
pub fn compile(
    filter: &str,
    link: LinkType,
    snaplen: u32,
) -> Result<Vec<BpfInstruction>, CaptureError> {
    let invalid =
        |reason: String| CaptureError::InvalidFilter { filter: filter.to_string(), reason };

    let dead = Capture::dead(pcap_linktype(link))?;
    let program = dead.compile(filter, true).map_err(|e| invalid(e.to_string()))?;

    // pcap's `Display for BpfInstruction` writes the `sock_filter` fields as
    // "{code} {jt} {jf} {k}" in decimal; parse_instruction depends on exactly that
    program
        .get_instructions()
        .iter()
        .map(|ins| parse_instruction(&ins.to_string()).map(|ins| clamp_return(ins, snaplen)))
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| invalid("compiler produced an unreadable instruction".to_string()))
}

fn pcap_linktype(link: LinkType) -> Linktype {
    match link {
        LinkType::Ethernet => Linktype::ETHERNET,
        LinkType::LinuxSll => Linktype::LINUX_SLL,
        LinkType::RawIp => Linktype::RAW,
    }
}

/// Parse the `code jt jf k` form libpcap prints for an instruction
fn parse_instruction(text: &str) -> Option<BpfInstruction> {
    let mut fields = text.split_whitespace();
    let ins = BpfInstruction {
        code: fields.next()?.parse().ok()?,
        jt: fields.next()?.parse().ok()?,
        jf: fields.next()?.parse().ok()?,
        k: fields.next()?.parse().ok()?,
    };
    fields.next().is_none().then_some(ins)
}

fn clamp_return(mut ins: BpfInstruction, snaplen: u32) -> BpfInstruction {
    if ins.code == BPF_RET_K && ins.k != 0 {
        ins.k = ins.k.min(snaplen);
    }
    ins
}
