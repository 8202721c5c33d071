use anyhow::{
  Context,
  anyhow
};
use chrono::{
  Datelike,
  Duration,
  NaiveDate,
  NaiveDateTime,
  NaiveTime,
  Weekday
};
use regex::Regex;
use tracing::trace;

/// Keywords and bare dates resolve to
/// the last minute of that day.
fn end_of_day(
  date: NaiveDate
) -> NaiveDateTime {
  date.and_time(
    NaiveTime::from_hms_opt(23, 59, 0)
      .unwrap_or(NaiveTime::MIN)
  )
}

/// Parses a `--due` argument. `none`
/// (or an empty string) clears the due
/// date.
#[tracing::instrument(skip(now))]
pub fn parse_due_arg(
  input: &str,
  now: NaiveDateTime
) -> anyhow::Result<Option<NaiveDateTime>>
{
  let token =
    input.trim().to_ascii_lowercase();
  if token.is_empty() || token == "none"
  {
    return Ok(None);
  }
  parse_due(&token, now).map(Some)
}

pub fn parse_due(
  token: &str,
  now: NaiveDateTime
) -> anyhow::Result<NaiveDateTime> {
  let today = now.date();

  match token {
    | "now" => return Ok(now),
    | "today" | "eod" => {
      return Ok(end_of_day(today));
    }
    | "tomorrow" => {
      return Ok(end_of_day(
        today + Duration::days(1)
      ));
    }
    | _ => {}
  }

  if let Some(weekday) =
    weekday_from_name(token)
  {
    let mut days_ahead =
      (weekday.num_days_from_monday()
        + 7
        - today
          .weekday()
          .num_days_from_monday())
        % 7;
    if days_ahead == 0 {
      days_ahead = 7;
    }
    return Ok(end_of_day(
      today
        + Duration::days(i64::from(
          days_ahead
        ))
    ));
  }

  let rel_re = Regex::new(
    r"^\+(?P<num>\d+)(?P<unit>[mhdw])$"
  )
  .map_err(|e| {
    anyhow!(
      "internal regex compile \
       failure: {e}"
    )
  })?;

  if let Some(caps) =
    rel_re.captures(token)
  {
    let num: i64 = caps["num"]
      .parse()
      .context(
        "invalid relative number"
      )?;
    let duration = match &caps["unit"] {
      | "m" => Duration::try_minutes(num),
      | "h" => Duration::try_hours(num),
      | "d" => Duration::try_days(num),
      | "w" => Duration::try_weeks(num),
      | unit => {
        return Err(anyhow!(
          "unknown relative unit: \
           {unit}"
        ));
      }
    };
    trace!(token, "parsed relative due date");
    return duration
      .and_then(|d| {
        now.checked_add_signed(d)
      })
      .ok_or_else(|| {
        anyhow!(
          "due date out of range: {token}"
        )
      });
  }

  for fmt in [
    "%Y-%m-%dt%H:%M:%S",
    "%Y-%m-%dt%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M"
  ] {
    if let Ok(ndt) =
      NaiveDateTime::parse_from_str(
        token, fmt
      )
    {
      return Ok(ndt);
    }
  }

  if let Ok(date) =
    NaiveDate::parse_from_str(
      token, "%Y-%m-%d"
    )
  {
    return Ok(end_of_day(date));
  }

  Err(anyhow!(
    "unrecognized due date: {token} \
     (try YYYY-MM-DD, YYYY-MM-DDTHH:MM, \
     today, tomorrow, a weekday or +3d)"
  ))
}

fn weekday_from_name(
  s: &str
) -> Option<Weekday> {
  match s {
    | "monday" | "mon" => {
      Some(Weekday::Mon)
    }
    | "tuesday" | "tue" | "tues" => {
      Some(Weekday::Tue)
    }
    | "wednesday" | "wed" => {
      Some(Weekday::Wed)
    }
    | "thursday" | "thu" | "thur"
    | "thurs" => Some(Weekday::Thu),
    | "friday" | "fri" => {
      Some(Weekday::Fri)
    }
    | "saturday" | "sat" => {
      Some(Weekday::Sat)
    }
    | "sunday" | "sun" => {
      Some(Weekday::Sun)
    }
    | _ => None
  }
}

#[cfg(test)]
mod tests {
  use chrono::{
    NaiveDate,
    NaiveDateTime
  };

  use super::parse_due_arg;

  fn now() -> NaiveDateTime {
    // Tuesday
    NaiveDate::from_ymd_opt(2026, 2, 17)
      .and_then(|d| d.and_hms_opt(12, 0, 0))
      .expect("valid now")
  }

  fn parsed(input: &str) -> String {
    parse_due_arg(input, now())
      .expect("parse due")
      .expect("due set")
      .format("%Y-%m-%d %H:%M")
      .to_string()
  }

  #[test]
  fn parses_iso_forms() {
    assert_eq!(
      parsed("2026-03-01T09:30"),
      "2026-03-01 09:30"
    );
    assert_eq!(
      parsed("2026-03-01 09:30:15"),
      "2026-03-01 09:30"
    );
    assert_eq!(
      parsed("2026-03-01"),
      "2026-03-01 23:59"
    );
  }

  #[test]
  fn parses_keywords_and_weekdays() {
    assert_eq!(
      parsed("today"),
      "2026-02-17 23:59"
    );
    assert_eq!(
      parsed("Tomorrow"),
      "2026-02-18 23:59"
    );
    assert_eq!(
      parsed("wednesday"),
      "2026-02-18 23:59"
    );
    assert_eq!(
      parsed("tue"),
      "2026-02-24 23:59"
    );
  }

  #[test]
  fn parses_relative_offsets() {
    assert_eq!(
      parsed("+3d"),
      "2026-02-20 12:00"
    );
    assert_eq!(
      parsed("+90m"),
      "2026-02-17 13:30"
    );
  }

  #[test]
  fn oversized_offsets_are_errors() {
    for input in [
      "+99999999999d",
      "+999999999w",
      "+99999999999999999h"
    ] {
      let err = parse_due_arg(input, now())
        .expect_err("out of range");
      assert!(
        err
          .to_string()
          .contains("out of range"),
        "{input}: {err}"
      );
    }
  }

  #[test]
  fn none_clears_and_garbage_fails() {
    assert!(
      parse_due_arg("none", now())
        .expect("none parses")
        .is_none()
    );
    assert!(
      parse_due_arg("someday", now())
        .is_err()
    );
  }
}
