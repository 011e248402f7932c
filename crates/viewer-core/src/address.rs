/// Absolute byte offset into the viewed file.
pub type Address = u64;

const KILO_BYTE: u64 = 1024;
const MEGA_BYTE: u64 = 1024 * KILO_BYTE;
const GIGA_BYTE: u64 = 1024 * MEGA_BYTE;
const TERA_BYTE: u64 = 1024 * GIGA_BYTE;

/// `0x00000001F4`
#[inline]
#[must_use]
pub fn hex10(addr: Address) -> String {
    format!("0x{addr:010X}")
}

/// `0x00000001F4 (500)`, the form used in every diagnostic.
#[inline]
#[must_use]
pub fn format_address(addr: Address) -> String {
    format!("{} ({addr})", hex10(addr))
}

/// Formats a byte count with binary units, e.g. `human_size(1536, 1) == "1.5KB"`.
#[must_use]
pub fn human_size(bytes: u64, precision: usize) -> String {
    let (unit, suffix) = if bytes > TERA_BYTE {
        (TERA_BYTE, "TB")
    } else if bytes > GIGA_BYTE {
        (GIGA_BYTE, "GB")
    } else if bytes > MEGA_BYTE {
        (MEGA_BYTE, "MB")
    } else if bytes > KILO_BYTE {
        (KILO_BYTE, "KB")
    } else {
        (1, "B")
    };

    format!("{:.precision$}{suffix}", bytes as f64 / unit as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_address() {
        assert_eq!(hex10(500), "0x00000001F4");
        assert_eq!(format_address(500), "0x00000001F4 (500)");
        assert_eq!(format_address(0), "0x0000000000 (0)");
        assert_eq!(
            format_address(20 * GIGA_BYTE),
            "0x0500000000 (21474836480)"
        );
    }

    #[test]
    fn test_human_size() {
        assert_eq!(human_size(512, 1), "512.0B");
        assert_eq!(human_size(1024, 1), "1024.0B");
        assert_eq!(human_size(1536, 1), "1.5KB");
        assert_eq!(human_size(3 * MEGA_BYTE / 2, 2), "1.50MB");
        assert_eq!(human_size(10 * GIGA_BYTE, 3), "10.000GB");
        assert_eq!(human_size(2 * TERA_BYTE, 1), "2.0TB");
    }
}
