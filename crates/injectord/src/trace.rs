//! Inbound trace files: one packet per line, whitespace-separated 32-bit
//! hex words. Blank lines and `#` comments are skipped.

use std::path::Path;

use anyhow::{bail, Context, Result};

use injector_core::wire::ROUTING_WORDS;

pub fn load(path: &Path) -> Result<Vec<Vec<u32>>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read trace {}", path.display()))?;
    parse(&text).with_context(|| format!("invalid trace {}", path.display()))
}

pub fn parse(text: &str) -> Result<Vec<Vec<u32>>> {
    let mut packets = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let line = line.split('#').next().unwrap_or_default().trim();
        if line.is_empty() {
            continue;
        }

        let words = line
            .split_whitespace()
            .map(word)
            .collect::<Result<Vec<_>>>()
            .with_context(|| format!("line {}", index + 1))?;

        // Target and size flits, then exactly as many flits as the size declares.
        let declared = words.get(1).map(|&size| size as usize + ROUTING_WORDS);
        if declared != Some(words.len()) {
            bail!(
                "line {}: {} words, payload size declares {:?}",
                index + 1,
                words.len(),
                declared
            );
        }
        packets.push(words);
    }
    Ok(packets)
}

fn word(token: &str) -> Result<u32> {
    let digits = token.trim_start_matches("0x");
    if digits.is_empty() || digits.len() > 8 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        bail!("bad word {token:?}");
    }
    u32::from_str_radix(digits, 16).with_context(|| format!("bad word {token:?}"))
}
