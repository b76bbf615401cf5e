// Indonesian (id-ID) date and time rendering

use chrono::{Datelike, NaiveDate, NaiveTime, Timelike, Weekday};

const MONTHS: [&str; 12] = [
    "Januari",
    "Februari",
    "Maret",
    "April",
    "Mei",
    "Juni",
    "Juli",
    "Agustus",
    "September",
    "Oktober",
    "November",
    "Desember",
];

const MONTHS_SHORT: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "Mei", "Jun", "Jul", "Agu", "Sep", "Okt", "Nov", "Des",
];

pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Senin",
        Weekday::Tue => "Selasa",
        Weekday::Wed => "Rabu",
        Weekday::Thu => "Kamis",
        Weekday::Fri => "Jumat",
        Weekday::Sat => "Sabtu",
        Weekday::Sun => "Minggu",
    }
}

pub fn month_name(month: u32) -> &'static str {
    MONTHS[(month as usize).saturating_sub(1) % 12]
}

/// Weekday, day, month name and year, e.g. `Selasa, 5 Maret 2024`
pub fn long_date(date: NaiveDate) -> String {
    format!(
        "{}, {} {} {}",
        weekday_name(date.weekday()),
        date.day(),
        month_name(date.month()),
        date.year()
    )
}

/// Day, abbreviated month and year, e.g. `5 Mar 2024`
pub fn short_date(date: NaiveDate) -> String {
    let month = MONTHS_SHORT[(date.month0() as usize) % 12];
    format!("{} {} {}", date.day(), month, date.year())
}

/// Dot-separated 24-hour time, e.g. `14.05.09`
pub fn time_of_day(time: NaiveTime) -> String {
    format!("{:02}.{:02}.{:02}", time.hour(), time.minute(), time.second())
}
