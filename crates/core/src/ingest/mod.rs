pub mod provider;
pub mod sample;
pub mod types;

/// NSE sector indices ingested when `SECTORS` is not set.
pub const DEFAULT_SECTORS: &[&str] = &[
    "NIFTY 50",
    "NIFTY AUTO",
    "NIFTY BANK",
    "NIFTY FMCG",
    "NIFTY IT",
    "NIFTY METAL",
    "NIFTY PHARMA",
    "NIFTY PSU BANK",
    "NIFTY REALTY",
    "NIFTY OIL & GAS",
    "NIFTY FINANCIAL SERVICES",
    "NIFTY MEDIA",
    "NIFTY ENERGY",
];

/// Comma-separated `SECTORS` override, falling back to [`DEFAULT_SECTORS`].
pub fn sectors_from_env() -> Vec<String> {
    parse_sector_list(std::env::var("SECTORS").ok().as_deref())
        .unwrap_or_else(|| DEFAULT_SECTORS.iter().map(|s| s.to_string()).collect())
}

pub fn parse_sector_list(raw: Option<&str>) -> Option<Vec<String>> {
    let list: Vec<String> = raw?
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    (!list.is_empty()).then_some(list)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_comma_list() {
        assert_eq!(
            parse_sector_list(Some(" NIFTY IT, ,NIFTY BANK ")),
            Some(vec!["NIFTY IT".to_string(), "NIFTY BANK".to_string()])
        );
        assert_eq!(parse_sector_list(Some(" , ")), None);
        assert_eq!(parse_sector_list(None), None);
    }
}
