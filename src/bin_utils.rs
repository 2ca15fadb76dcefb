use crate::config::LearningPolicy;
use csv::Writer;
use itertools::Itertools;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub fn write_records(output: &Path, records: Vec<impl Serialize>) -> csv::Result<()> {
    if let Some(parent) = output.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent)
                .expect(format!("Could not create dir {}", parent.display()).as_str());
        }
    }

    let mut writer = Writer::from_path(output)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn parse_comma_range_num_list(
    s: &str,
) -> Result<Vec<usize>, <usize as std::str::FromStr>::Err> {
    use either::Either;
    Ok(s.split(",")
        .map(|val| {
            if val.contains("-") {
                let (beg, end) = val.split_once("-").unwrap();
                let beg: usize = beg.parse()?;
                let end: usize = end.parse()?;
                Ok(Either::Left(beg..(end + 1)))
            } else {
                let num: usize = val.parse()?;
                Ok(Either::Right(std::iter::once(num)))
            }
        })
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .flatten()
        .sorted_unstable()
        .collect())
}

pub fn parse_comma_policy_list(s: &str) -> Result<Vec<LearningPolicy>, strum::ParseError> {
    s.split(",")
        .map(|policy| LearningPolicy::from_str(policy))
        .collect::<Result<_, _>>()
}

pub fn default_output_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("output")
}

pub fn default_policies() -> Vec<LearningPolicy> {
    vec![
        LearningPolicy::Uct,
        LearningPolicy::Brue,
        LearningPolicy::EngineOpt,
    ]
}

pub fn init_logger(debug: bool) {
    let level = if debug {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{} {}] {}",
                chrono::Local::now().format("%H:%M:%S%.3f"),
                record.level(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stdout())
        .apply()
        .expect("logger already initialized");
}

pub fn hostname() -> String {
    let name = gethostname::gethostname();
    let name = name.into_string().unwrap();
    if name.starts_with('"') {
        name.strip_prefix('"')
            .unwrap()
            .strip_suffix('"')
            .unwrap()
            .to_string()
    } else {
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_comma_range_num_list() {
        assert_eq!(parse_comma_range_num_list("3").unwrap(), vec![3]);
        assert_eq!(parse_comma_range_num_list("3-5,8").unwrap(), vec![3, 4, 5, 8]);
    }

    #[test]
    fn test_parse_comma_policy_list() {
        assert_eq!(
            parse_comma_policy_list("uct,brue").unwrap(),
            vec![LearningPolicy::Uct, LearningPolicy::Brue]
        );
        assert!(parse_comma_policy_list("nope").is_err());
    }
}
