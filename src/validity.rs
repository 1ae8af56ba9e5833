use crate::dom::{Dom, NodeId};
use crate::js_regex::Regex;
use crate::Result;

/// Constraint validation flags of a form control, mirroring the browser
/// `ValidityState`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidityState {
    pub value_missing: bool,
    pub type_mismatch: bool,
    pub pattern_mismatch: bool,
    pub too_long: bool,
    pub too_short: bool,
    pub range_underflow: bool,
    pub range_overflow: bool,
    pub step_mismatch: bool,
    pub bad_input: bool,
}

impl ValidityState {
    pub fn valid(&self) -> bool {
        !(self.value_missing
            || self.type_mismatch
            || self.pattern_mismatch
            || self.too_long
            || self.too_short
            || self.range_underflow
            || self.range_overflow
            || self.step_mismatch
            || self.bad_input)
    }
}

const MS_PER_DAY: i64 = 86_400_000;
// Largest year a date control accepts.
const MAX_DATE_YEAR: i64 = 275_760;

impl Dom {
    /// Runs native constraint validation for `node`. Elements that are not
    /// form controls, disabled controls and button-like inputs are barred
    /// from validation and always report valid.
    pub fn validity(&self, node: NodeId) -> Result<ValidityState> {
        let mut validity = ValidityState::default();

        if self.is_effectively_disabled(node) {
            return Ok(validity);
        }
        let Some(tag_name) = self.tag_name(node) else {
            return Ok(validity);
        };

        if tag_name.eq_ignore_ascii_case("textarea") {
            let value = self.value(node)?;
            if self.required(node) && !self.readonly(node) && value.is_empty() {
                validity.value_missing = true;
            }
            if !value.is_empty() {
                self.check_length(node, &value, &mut validity);
            }
            return Ok(validity);
        }

        if tag_name.eq_ignore_ascii_case("select") {
            if self.required(node) {
                validity.value_missing = !self
                    .selected_options(node)
                    .into_iter()
                    .any(|option| !self.option_value(option).is_empty());
            }
            return Ok(validity);
        }

        if !tag_name.eq_ignore_ascii_case("input") {
            return Ok(validity);
        }

        let input_type = self.input_type(node);
        if !input_participates_in_constraint_validation(&input_type) {
            return Ok(validity);
        }
        let value = self.value(node)?;
        let multiple = self.has_attr(node, "multiple");
        let email_multiple = input_type == "email" && multiple;
        let value_is_empty = if email_multiple {
            value.trim().is_empty()
        } else {
            value.is_empty()
        };

        if self.required(node) && !self.readonly(node) {
            validity.value_missing = match input_type.as_str() {
                "checkbox" => !self.checked(node)?,
                "radio" => !self.is_radio_group_checked(node)?,
                "range" | "color" => false,
                _ => value_is_empty,
            };
        }

        if value_is_empty {
            return Ok(validity);
        }

        if input_type == "email" {
            validity.type_mismatch = if email_multiple {
                !is_email_address_list(&value)
            } else {
                !is_simple_email(&value)
            };
        } else if input_type == "url" {
            validity.type_mismatch = !is_absolute_url(&value);
        }

        if matches!(
            input_type.as_str(),
            "text" | "search" | "url" | "tel" | "email" | "password"
        ) {
            self.check_length(node, &value, &mut validity);
            self.check_pattern(node, &value, email_multiple, &mut validity);
        }

        let parse: Option<fn(&str) -> Option<f64>> = match input_type.as_str() {
            "number" | "range" => Some(parse_number_value),
            "date" => Some(parse_date_numeric),
            "time" => Some(parse_time_numeric),
            "datetime-local" => Some(parse_datetime_local_numeric),
            _ => None,
        };
        if let Some(parse) = parse {
            match parse(&value) {
                Some(numeric) => self.check_range_and_step(
                    node,
                    &input_type,
                    numeric,
                    parse,
                    &mut validity,
                ),
                None => validity.bad_input = true,
            }
        }

        Ok(validity)
    }

    fn check_length(&self, node: NodeId, value: &str, validity: &mut ValidityState) {
        let value_len = value.chars().count() as i64;
        if let Some(min_len) = self.parse_attr_i64(node, "minlength") {
            if min_len >= 0 && value_len < min_len {
                validity.too_short = true;
            }
        }
        if let Some(max_len) = self.parse_attr_i64(node, "maxlength") {
            if max_len >= 0 && value_len > max_len {
                validity.too_long = true;
            }
        }
    }

    fn check_pattern(
        &self,
        node: NodeId,
        value: &str,
        email_multiple: bool,
        validity: &mut ValidityState,
    ) {
        let Some(pattern) = self.attr(node, "pattern") else {
            return;
        };
        if pattern.is_empty() {
            return;
        }
        // An uncompilable pattern never produces a mismatch.
        let Ok(regex) = Regex::anchored(&pattern) else {
            return;
        };
        let mismatch = |part: &str| matches!(regex.is_match(part), Ok(false));
        validity.pattern_mismatch = if email_multiple {
            value
                .split(',')
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .any(mismatch)
        } else {
            mismatch(value)
        };
    }

    fn check_range_and_step(
        &self,
        node: NodeId,
        input_type: &str,
        numeric: f64,
        parse: fn(&str) -> Option<f64>,
        validity: &mut ValidityState,
    ) {
        let min = self.attr(node, "min").and_then(|raw| parse(&raw));
        let max = self.attr(node, "max").and_then(|raw| parse(&raw));

        match (min, max) {
            // A reversed time range wraps past midnight.
            (Some(min), Some(max)) if input_type == "time" && min > max => {
                if numeric < min && numeric > max {
                    validity.range_underflow = true;
                    validity.range_overflow = true;
                }
            }
            _ => {
                if min.is_some_and(|min| numeric < min) {
                    validity.range_underflow = true;
                }
                if max.is_some_and(|max| numeric > max) {
                    validity.range_overflow = true;
                }
            }
        }

        let step_attr = self.attr(node, "step").unwrap_or_default();
        if step_attr.eq_ignore_ascii_case("any") {
            return;
        }
        let (default_step, scale) = match input_type {
            "date" => (1.0, MS_PER_DAY as f64),
            "time" | "datetime-local" => (60.0, 1_000.0),
            _ => (1.0, 1.0),
        };
        let step = step_attr
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite() && *value > 0.0)
            .unwrap_or(default_step)
            * scale;
        let base = min
            .or_else(|| self.attr(node, "value").and_then(|raw| parse(&raw)))
            .unwrap_or(0.0);
        let ratio = (numeric - base) / step;
        if (ratio - ratio.round()).abs() > 1e-7 {
            validity.step_mismatch = true;
        }
    }

    fn parse_attr_i64(&self, node: NodeId, name: &str) -> Option<i64> {
        self.attr(node, name).and_then(|raw| {
            let raw = raw.trim();
            if raw.is_empty() {
                None
            } else {
                raw.parse::<i64>().ok()
            }
        })
    }

    fn is_radio_group_checked(&self, node: NodeId) -> Result<bool> {
        for radio in self.radio_group(node) {
            if self.checked(radio)? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

fn input_participates_in_constraint_validation(kind: &str) -> bool {
    !matches!(kind, "button" | "submit" | "reset" | "hidden" | "image")
}

fn parse_number_value(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    raw.parse::<f64>().ok().filter(|value| value.is_finite())
}

fn parse_date_numeric(raw: &str) -> Option<f64> {
    parse_date_input_value_ms(raw).map(|ms| ms as f64)
}

fn parse_time_numeric(raw: &str) -> Option<f64> {
    parse_time_input_value_ms(raw).map(|ms| ms as f64)
}

fn parse_datetime_local_numeric(raw: &str) -> Option<f64> {
    parse_datetime_local_input_value_ms(raw).map(|ms| ms as f64)
}

fn is_ascii_email_local_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || "!#$%&'*+/=?^_`{|}~.-".contains(ch)
}

fn is_valid_email_domain_label(label: &str) -> bool {
    if label.is_empty() || label.len() > 63 {
        return false;
    }
    let bytes = label.as_bytes();
    bytes[0].is_ascii_alphanumeric()
        && bytes[bytes.len() - 1].is_ascii_alphanumeric()
        && bytes.iter().all(|b| b.is_ascii_alphanumeric() || *b == b'-')
}

fn is_simple_email(value: &str) -> bool {
    let trimmed = value.trim();
    let Some((local, domain)) = trimmed.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && local.chars().all(is_ascii_email_local_char)
        && !domain.is_empty()
        && domain.split('.').all(is_valid_email_domain_label)
}

fn is_email_address_list(value: &str) -> bool {
    value
        .split(',')
        .map(str::trim)
        .all(|part| !part.is_empty() && is_simple_email(part))
}

/// Absolute URL check: a scheme, then a non-empty remainder. Schemes with
/// an authority component need a host after `//`.
fn is_absolute_url(value: &str) -> bool {
    let value = value.trim();
    let Some((scheme, rest)) = value.split_once(':') else {
        return false;
    };
    let mut chars = scheme.chars();
    let scheme_ok = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    if !scheme_ok || rest.is_empty() || rest.chars().any(char::is_whitespace) {
        return false;
    }
    match scheme.to_ascii_lowercase().as_str() {
        "http" | "https" | "ftp" | "ws" | "wss" => rest
            .strip_prefix("//")
            .and_then(|authority| authority.split(['/', '?', '#']).next())
            .is_some_and(|host| !host.is_empty()),
        _ => true,
    }
}

fn parse_fixed_digits(raw: &str, len: usize) -> Option<u32> {
    if raw.len() != len || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

fn days_in_month(year: i64, month: u32) -> u32 {
    match month {
        2 if (year % 4 == 0 && year % 100 != 0) || year % 400 == 0 => 29,
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

fn days_from_civil(year: i64, month: u32, day: u32) -> i64 {
    let y = if month <= 2 { year - 1 } else { year };
    let era = y.div_euclid(400);
    let yoe = y - era * 400;
    let m = i64::from(month);
    let mp = if m > 2 { m - 3 } else { m + 9 };
    let doy = (153 * mp + 2) / 5 + i64::from(day) - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe - 719_468
}

fn parse_date_input_value_ms(raw: &str) -> Option<i64> {
    let mut parts = raw.splitn(3, '-');
    let year_raw = parts.next()?;
    if year_raw.len() < 4 || !year_raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year: i64 = year_raw.parse().ok()?;
    let month = parse_fixed_digits(parts.next()?, 2)?;
    let day = parse_fixed_digits(parts.next()?, 2)?;
    if !(1..=MAX_DATE_YEAR).contains(&year)
        || !(1..=12).contains(&month)
        || day == 0
        || day > days_in_month(year, month)
    {
        return None;
    }
    Some(days_from_civil(year, month, day) * MS_PER_DAY)
}

fn parse_time_input_value_ms(raw: &str) -> Option<i64> {
    let mut parts = raw.splitn(3, ':');
    let hour = parse_fixed_digits(parts.next()?, 2)?;
    let minute = parse_fixed_digits(parts.next()?, 2)?;
    let (second, millis) = match parts.next() {
        None => (0, 0),
        Some(rest) => {
            let (sec_raw, frac_raw) = match rest.split_once('.') {
                Some((sec, frac)) => (sec, Some(frac)),
                None => (rest, None),
            };
            let second = parse_fixed_digits(sec_raw, 2)?;
            let millis = match frac_raw {
                None => 0,
                Some(frac) if (1..=3).contains(&frac.len()) => {
                    parse_fixed_digits(frac, frac.len())? * 10u32.pow(3 - frac.len() as u32)
                }
                Some(_) => return None,
            };
            (second, millis)
        }
    };
    if hour > 23 || minute > 59 || second > 59 {
        return None;
    }
    Some(
        (i64::from(hour) * 3_600 + i64::from(minute) * 60 + i64::from(second)) * 1_000
            + i64::from(millis),
    )
}

fn parse_datetime_local_input_value_ms(raw: &str) -> Option<i64> {
    let (date, time) = raw.split_once(['T', ' '])?;
    Some(parse_date_input_value_ms(date)? + parse_time_input_value_ms(time)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validity_of(html: &str) -> Result<ValidityState> {
        let dom = Dom::parse(html)?;
        let node = dom.by_id("x").expect("element with id x");
        dom.validity(node)
    }

    #[test]
    fn required_text_input_is_missing_only_when_empty() -> Result<()> {
        assert!(validity_of("<input id='x' required value=''>")?.value_missing);
        assert!(validity_of("<input id='x' required value='Lemonade'>")?.valid());
        Ok(())
    }

    #[test]
    fn readonly_and_disabled_controls_are_barred() -> Result<()> {
        assert!(validity_of("<input id='x' required readonly>")?.valid());
        assert!(validity_of("<input id='x' required disabled>")?.valid());
        assert!(validity_of("<fieldset disabled><input id='x' required></fieldset>")?.valid());
        assert!(validity_of("<input id='x' type='hidden' required>")?.valid());
        Ok(())
    }

    #[test]
    fn checkbox_and_radio_group_value_missing() -> Result<()> {
        assert!(validity_of("<input id='x' type='checkbox' required>")?.value_missing);
        assert!(validity_of("<input id='x' type='checkbox' required checked>")?.valid());
        let grouped = "<form><input id='x' type='radio' name='g' required><input type='radio' name='g' checked></form>";
        assert!(validity_of(grouped)?.valid());
        let unchecked = "<form><input id='x' type='radio' name='g' required><input type='radio' name='g'></form>";
        assert!(validity_of(unchecked)?.value_missing);
        Ok(())
    }

    #[test]
    fn required_select_needs_a_non_empty_selection() -> Result<()> {
        let placeholder = "<select id='x' required><option value=''>Pick</option><option>Red</option></select>";
        assert!(validity_of(placeholder)?.value_missing);
        let picked = "<select id='x' required><option value=''>Pick</option><option selected>Red</option></select>";
        assert!(validity_of(picked)?.valid());
        let multiple = "<select id='x' required multiple><option>Red</option></select>";
        assert!(validity_of(multiple)?.value_missing);
        Ok(())
    }

    #[test]
    fn email_and_url_type_mismatch() -> Result<()> {
        assert!(validity_of("<input id='x' type='email' value='nope'>")?.type_mismatch);
        assert!(validity_of("<input id='x' type='email' value='a@example.com'>")?.valid());
        assert!(
            validity_of("<input id='x' type='email' multiple value='a@b.c, d@e.f'>")?.valid()
        );
        assert!(validity_of("<input id='x' type='url' value='example.com'>")?.type_mismatch);
        assert!(validity_of("<input id='x' type='url' value='https://example.com/a'>")?.valid());
        assert!(validity_of("<input id='x' type='url' value='http://'>")?.type_mismatch);
        Ok(())
    }

    #[test]
    fn pattern_is_anchored_and_skips_empty_values() -> Result<()> {
        assert!(validity_of("<input id='x' pattern='[a-z]+' value='abc1'>")?.pattern_mismatch);
        assert!(validity_of("<input id='x' pattern='[a-z]+' value='abc'>")?.valid());
        assert!(validity_of("<input id='x' pattern='[a-z]+' value=''>")?.valid());
        assert!(validity_of("<input id='x' pattern='(' value='anything'>")?.valid());
        Ok(())
    }

    #[test]
    fn required_and_pattern_both_flag_empty_value_missing_only() -> Result<()> {
        let state = validity_of("<input id='x' required pattern='[0-9]+' value=''>")?;
        assert!(state.value_missing);
        assert!(!state.pattern_mismatch);
        Ok(())
    }

    #[test]
    fn number_range_and_step() -> Result<()> {
        assert!(validity_of("<input id='x' type='number' max='10' value='11'>")?.range_overflow);
        assert!(validity_of("<input id='x' type='number' min='5' value='4'>")?.range_underflow);
        assert!(validity_of("<input id='x' type='number' min='0' value='1.5'>")?.step_mismatch);
        assert!(validity_of("<input id='x' type='number' step='any' value='1.5'>")?.valid());
        assert!(validity_of("<input id='x' type='number' value='abc'>")?.bad_input);
        Ok(())
    }

    #[test]
    fn out_of_range_years_are_bad_input() -> Result<()> {
        let far = validity_of(
            "<input id='x' type='date' min='2024-01-01' value='9999999999-01-01'>",
        )?;
        assert!(far.bad_input);
        assert!(!far.range_underflow && !far.range_overflow);
        assert!(
            validity_of("<input id='x' type='datetime-local' value='275761-01-01T00:00'>")?
                .bad_input
        );
        assert!(validity_of("<input id='x' type='date' value='275760-09-13'>")?.valid());
        // An unparsable bound is ignored.
        assert!(
            validity_of("<input id='x' type='date' max='9999999999-01-01' value='2024-01-01'>")?
                .valid()
        );
        Ok(())
    }

    #[test]
    fn date_and_time_ranges() -> Result<()> {
        assert!(
            validity_of("<input id='x' type='date' max='2024-01-31' value='2024-02-01'>")?
                .range_overflow
        );
        assert!(
            validity_of("<input id='x' type='date' min='2024-01-31' value='2024-01-30'>")?
                .range_underflow
        );
        assert!(validity_of("<input id='x' type='date' value='2023-02-29'>")?.bad_input);
        assert!(
            validity_of("<input id='x' type='time' min='09:00' max='17:00' value='18:00'>")?
                .range_overflow
        );
        // Reversed range wraps past midnight.
        assert!(
            validity_of("<input id='x' type='time' min='22:00' max='02:00' value='23:00'>")?
                .valid()
        );
        assert!(
            validity_of(
                "<input id='x' type='datetime-local' max='2024-01-01T10:00' value='2024-01-01T10:01'>"
            )?
            .range_overflow
        );
        Ok(())
    }

    #[test]
    fn textarea_length_limits() -> Result<()> {
        assert!(validity_of("<textarea id='x' minlength='5'>abc</textarea>")?.too_short);
        assert!(validity_of("<textarea id='x' maxlength='2'>abc</textarea>")?.too_long);
        assert!(validity_of("<textarea id='x' required></textarea>")?.value_missing);
        Ok(())
    }

    #[test]
    fn civil_day_count_matches_known_dates() {
        assert_eq!(days_from_civil(1970, 1, 1), 0);
        assert_eq!(days_from_civil(2000, 3, 1), 11_017);
        assert_eq!(parse_time_input_value_ms("01:02:03.5"), Some(3_723_500));
        assert_eq!(parse_time_input_value_ms("24:00"), None);
    }
}
