use time::{format_description::well_known::Rfc3339, OffsetDateTime, PrimitiveDateTime};

/// Current UTC time truncated to microseconds, the precision Postgres
/// TIMESTAMP columns store. Values written and read back compare equal.
pub(crate) fn primitive_now_utc() -> PrimitiveDateTime {
    let now = OffsetDateTime::now_utc();
    let time = now.time();
    let time = time.replace_nanosecond(time.nanosecond() / 1000 * 1000).unwrap_or(time);
    PrimitiveDateTime::new(now.date(), time)
}

pub(crate) fn format_primitive(value: PrimitiveDateTime) -> String {
    value.assume_utc().format(&Rfc3339).unwrap_or_else(|_| value.assume_utc().to_string())
}

/// Export-friendly "YYYY-MM-DD HH:MM:SS" rendering for spreadsheet cells.
pub(crate) fn format_export(value: PrimitiveDateTime) -> String {
    let format = time::macros::format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    value.format(&format).unwrap_or_else(|_| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::{Date, Time};

    #[test]
    fn now_is_truncated_to_microseconds() {
        let now = primitive_now_utc();
        assert_eq!(now.nanosecond() % 1000, 0);
    }

    #[test]
    fn format_primitive_outputs_utc_z() {
        let date = Date::from_calendar_date(2025, time::Month::January, 2).unwrap();
        let time = Time::from_hms(10, 20, 30).unwrap();
        let value = PrimitiveDateTime::new(date, time);
        assert_eq!(format_primitive(value), "2025-01-02T10:20:30Z");
    }

    #[test]
    fn format_export_is_space_separated() {
        let date = Date::from_calendar_date(2025, time::Month::June, 7).unwrap();
        let time = Time::from_hms(9, 5, 1).unwrap();
        let value = PrimitiveDateTime::new(date, time);
        assert_eq!(format_export(value), "2025-06-07 09:05:01");
    }
}
