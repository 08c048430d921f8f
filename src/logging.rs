// Logger setup - fern dispatch to stderr, stdout is reserved for JSON output

use time::macros::format_description;
use time::OffsetDateTime;

pub fn init_logger(level: log::LevelFilter) -> Result<(), fern::InitError> {
    let date_fmt = format_description!("[year]-[month]-[day]");
    let time_fmt = format_description!("[hour]:[minute]:[second]");

    let format = move |out: fern::FormatCallback<'_>, message: &std::fmt::Arguments<'_>, record: &log::Record| {
        let now = OffsetDateTime::now_utc();
        out.finish(format_args!(
            "[{}][{}][{}][{}] {}",
            now.format(&date_fmt).unwrap_or_default(),
            now.format(&time_fmt).unwrap_or_default(),
            record.target(),
            record.level(),
            message
        ))
    };

    fern::Dispatch::new()
        .format(format)
        .level(level)
        // reqwest/hyper are noisy at debug
        .level_for("hyper", log::LevelFilter::Warn)
        .level_for("reqwest", log::LevelFilter::Warn)
        .chain(std::io::stderr())
        .apply()?;

    Ok(())
}
