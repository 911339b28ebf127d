//! JSON rendering with optional pretty-printing.

use anyhow::Result;
use serde::Serialize;

pub fn render<T: Serialize>(value: &T, pretty: bool) -> Result<String> {
    let out = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sable_core::types::UsageIndex;

    #[test]
    fn test_compact_and_pretty() {
        let usage = UsageIndex {
            file_count: 2,
            ..Default::default()
        };
        let compact = render(&usage, false).unwrap();
        assert!(!compact.contains('\n'));
        let pretty = render(&usage, true).unwrap();
        assert!(pretty.contains('\n'));
        assert!(pretty.contains("\"fileCount\": 2"));
    }
}
