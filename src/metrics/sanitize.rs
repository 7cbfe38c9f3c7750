/// Replace every character outside `[A-Za-z0-9_:]` with `_`.
///
/// Works per character, so a multi-byte character becomes a single `_`.
pub fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == ':' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_valid(name: &str) -> bool {
        name.chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
    }

    #[test]
    fn test_sanitize_keeps_valid_names() {
        assert_eq!(sanitize("cpu_temp:celsius"), "cpu_temp:celsius");
        assert_eq!(sanitize("Disk0"), "Disk0");
    }

    #[test]
    fn test_sanitize_replaces_invalid_chars() {
        assert_eq!(sanitize("gpu.0-temp"), "gpu_0_temp");
        assert_eq!(sanitize("fan speed/rpm"), "fan_speed_rpm");
        assert_eq!(sanitize("温度"), "__");
        assert_eq!(sanitize(""), "");
    }

    #[test]
    fn test_sanitize_properties() {
        let inputs = [
            "battery",
            "a b\tc",
            "i2c-1@0x48",
            "ünïcödé_κλειδί",
            "::__::",
            "emoji🔋level",
            "#$%^&*()",
        ];
        for input in inputs {
            let once = sanitize(input);
            assert_eq!(once.chars().count(), input.chars().count());
            assert!(is_valid(&once), "{:?} -> {:?}", input, once);
            assert_eq!(sanitize(&once), once);
        }
    }
}
