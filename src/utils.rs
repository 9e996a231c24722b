use std::io;

pub fn get_tqdm_style() -> indicatif::ProgressStyle {
    indicatif::ProgressStyle::with_template(
        "{percent:>3}% |{wide_bar}| {bytes}/{total_bytes} \
         [{elapsed_precise}<{eta_precise}, {custom_per_sec}]",
    )
    .unwrap()
    .with_key(
        "custom_per_sec",
        Box::new(|s: &indicatif::ProgressState, w: &mut dyn std::fmt::Write| {
            write!(w, "{:.2} B/s", s.per_sec()).unwrap()
        }),
    )
    .progress_chars("██ ")
}

/// Log to stderr at info level (debug if `verbose`), `RUST_LOG` takes precedence
pub fn init_logger(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Read lines into a reused buffer, yielding `None` at end of stream
pub trait BufReadLine {
    fn next_line<'buf>(&mut self, buffer: &'buf mut String)
    -> Option<io::Result<&'buf mut String>>;
}

impl<R> BufReadLine for R
where
    R: io::BufRead,
{
    fn next_line<'buf>(
        &mut self,
        buffer: &'buf mut String,
    ) -> Option<io::Result<&'buf mut String>> {
        buffer.clear();

        io::BufRead::read_line(self, buffer)
            .map(|u| if u == 0 { None } else { Some(buffer) })
            .transpose()
    }
}

/// Round to `digits` decimal places, half away from zero
pub fn round_to(value: f64, digits: i32) -> f64 {
    let scale = 10f64.powi(digits);
    (value * scale).round() / scale
}
