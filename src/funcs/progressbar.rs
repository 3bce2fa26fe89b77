use color_eyre::eyre::Error;

pub fn get_spinner(
    spinner_fmt: &str,
    spinner_strset: &[&str],
) -> Result<indicatif::ProgressBar, Error> {
    Ok(indicatif::ProgressBar::new_spinner().with_style(
        indicatif::ProgressStyle::with_template(spinner_fmt)?.tick_strings(spinner_strset),
    ))
}

pub fn get_progbar(
    len: u64,
    bar_fmt: &str,
    bar_char: &str,
) -> Result<indicatif::ProgressBar, Error> {
    Ok(indicatif::ProgressBar::new(len)
        .with_style(indicatif::ProgressStyle::with_template(bar_fmt)?.progress_chars(bar_char)))
}

/// Byte counter for a single transfer. An unknown (or zero) length gets a
/// spinner that still counts bytes instead of a bar stuck at 0/0.
pub fn create_transfer_bar(
    mpb: &indicatif::MultiProgress,
    content_length: Option<u64>,
    name: &str,
) -> Result<indicatif::ProgressBar, Error> {
    let pb = match content_length {
        Some(len) if len > 0 => get_progbar(
            len,
            crate::consts::SUB_BAR_FMT_MSG,
            crate::consts::MAIN_BAR_CHARSET,
        )?,
        _ => {
            let pb = get_spinner(
                crate::consts::SUB_SPINNER_FMT_MSG,
                crate::consts::SPINNER_STRSET_DOTS12,
            )?;
            pb.enable_steady_tick(std::time::Duration::from_millis(80));
            pb
        }
    };

    Ok(mpb.add(pb.with_message(name.to_string())))
}

pub fn create_indefinite_spinner(
    mpb: &indicatif::MultiProgress,
    msg: impl Into<std::borrow::Cow<'static, str>>,
) -> Result<indicatif::ProgressBar, Error> {
    let pb = mpb.add(
        get_spinner(
            crate::consts::SPINNER_FMT,
            crate::consts::SPINNER_STRSET_DOTS12,
        )?
        .with_message(msg),
    );

    pb.enable_steady_tick(std::time::Duration::from_millis(80));

    Ok(pb)
}
