//! 服务端时间字段解析。

use chrono::NaiveDateTime;

/// 小于等于该值的整数按秒级时间戳处理（约到 2286 年）。
const MAX_EPOCH_SECONDS: i64 = 9_999_999_999;

/// 解析服务端 `time` 字段为毫秒时间戳，无法识别时返回 0。
///
/// - 整数且在 `1..=9_999_999_999`：秒级时间戳
/// - 其他整数：毫秒级时间戳
/// - `YYYY-MM-DD HH:MM:SS`：按 UTC 解析
pub fn parse_time_to_epoch_ms(raw: &str) -> i64 {
    let value = raw.trim();
    if value.is_empty() {
        return 0;
    }
    if let Ok(number) = value.parse::<i64>() {
        return if (1..=MAX_EPOCH_SECONDS).contains(&number) {
            number.saturating_mul(1000)
        } else {
            number
        };
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
        .map(|datetime| datetime.and_utc().timestamp_millis())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seconds_are_scaled_to_millis() {
        assert_eq!(parse_time_to_epoch_ms("1700000000"), 1_700_000_000_000);
        assert_eq!(parse_time_to_epoch_ms(" 1 "), 1_000);
    }

    #[test]
    fn large_numbers_are_millis() {
        assert_eq!(parse_time_to_epoch_ms("1700000000123"), 1_700_000_000_123);
        assert_eq!(parse_time_to_epoch_ms("0"), 0);
    }

    #[test]
    fn datetime_text_is_utc() {
        assert_eq!(
            parse_time_to_epoch_ms("2023-11-14 22:13:20"),
            1_700_000_000_000
        );
    }

    #[test]
    fn unknown_formats_yield_zero() {
        assert_eq!(parse_time_to_epoch_ms(""), 0);
        assert_eq!(parse_time_to_epoch_ms("   "), 0);
        assert_eq!(parse_time_to_epoch_ms("yesterday"), 0);
        assert_eq!(parse_time_to_epoch_ms("2023-11-14T22:13:20Z"), 0);
    }
}
