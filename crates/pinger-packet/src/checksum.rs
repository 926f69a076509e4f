//! Checksum implementations for `ICMP` over `IPv4`.
//!
//! `ICMPv6` checksums include a pseudo header and are filled in by the kernel
//! for raw `ICMPv6` sockets, so no function is provided for them here.

/// Calculate the checksum for an `IPv4` `ICMP` packet.
///
/// The checksum field itself (the second 16-bit word) is skipped.
#[must_use]
pub fn icmp_ipv4_checksum(data: &[u8]) -> u16 {
    checksum(data, 1)
}

fn checksum(data: &[u8], ignore_word: usize) -> u16 {
    if data.is_empty() {
        return 0;
    }
    finalize_checksum(sum_be_words(data, ignore_word))
}

fn sum_be_words(data: &[u8], ignore_word: usize) -> u32 {
    let mut chunks = data.chunks_exact(2);
    let mut sum = chunks
        .by_ref()
        .enumerate()
        .filter(|(i, _)| *i != ignore_word)
        .map(|(_, word)| u32::from(u16::from_be_bytes([word[0], word[1]])))
        .sum::<u32>();
    if let [last] = chunks.remainder() {
        if data.len() / 2 != ignore_word {
            sum += u32::from(*last) << 8;
        }
    }
    sum
}

const fn finalize_checksum(mut sum: u32) -> u16 {
    while sum >> 16 != 0 {
        sum = (sum >> 16) + (sum & 0xFFFF);
    }
    !sum as u16
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_empty_checksum() {
        assert_eq!(0, icmp_ipv4_checksum(&[]));
    }

    #[test]
    fn test_odd_length() {
        assert_eq!(65535, icmp_ipv4_checksum(&[0x00]));
        assert_eq!(0xf7ff, icmp_ipv4_checksum(&[0x08, 0x00, 0xab]));
    }

    #[test]
    fn test_icmp_ipv4_echo_request_checksum() {
        let bytes = hex!("08 00 00 00 1c 2b 00 03");
        assert_eq!(0xdbd1, icmp_ipv4_checksum(&bytes));
    }

    #[test]
    fn test_icmp_ipv4_checksum_ignores_checksum_field() {
        let bytes = hex!(
            "
            08 00 ff ff 1c 2b 00 03 17 f9 a3 c2 d1 e0 4b 00
            2a 3b 4c 5d 6e 7f 00 11
            "
        );
        assert_eq!(0x1e0c, icmp_ipv4_checksum(&bytes));
    }
}
