use anyhow::Result;
use log::info;
use mcmc_util::{PosteriorDraws, SummaryRow};
use std::io::Write;

use super::common_io::{open_buf_writer, read_data_lines};
use crate::model::ImputedResponse;
use crate::simulation::TrialRecord;

const MISSING: &str = "NA";

fn fields(line: &str) -> Vec<&str> {
    line.split('\t').map(str::trim).collect()
}

/// `subject  group  time  response`, missing responses as `NA`
pub fn write_trial(records: &[TrialRecord], path: &str) -> Result<()> {
    let mut buf = open_buf_writer(path)?;
    writeln!(buf, "subject\tgroup\ttime\tresponse")?;
    for rec in records {
        match rec.response {
            Some(y) => writeln!(buf, "{}\t{}\t{}\t{:.6}", rec.subject, rec.arm, rec.visit, y)?,
            None => writeln!(buf, "{}\t{}\t{}\t{}", rec.subject, rec.arm, rec.visit, MISSING)?,
        }
    }
    buf.flush()?;
    info!("Wrote {} trial records: {}", records.len(), path);
    Ok(())
}

pub fn read_trial(path: &str) -> Result<Vec<TrialRecord>> {
    let lines = read_data_lines(path)?;
    let mut records = Vec::with_capacity(lines.len());

    for (lineno, line) in lines.iter().skip(1) {
        let words = fields(line);
        if words.len() != 4 {
            anyhow::bail!("{}:{}: expected 4 fields, found {}", path, lineno, words.len());
        }
        let parse = || -> Result<TrialRecord> {
            let response = if words[3].eq_ignore_ascii_case(MISSING) || words[3].is_empty() {
                None
            } else {
                Some(words[3].parse::<f64>()?)
            };
            Ok(TrialRecord {
                subject: words[0].parse()?,
                arm: words[1].parse()?,
                visit: words[2].parse()?,
                response,
            })
        };
        records.push(parse().map_err(|e| anyhow::anyhow!("{}:{}: {}", path, lineno, e))?);
    }

    info!("Read {} trial records from {}", records.len(), path);
    Ok(records)
}

/// Header of coefficient names, then one tab-separated sample per line
pub fn write_draws(draws: &PosteriorDraws, path: &str) -> Result<()> {
    let mut buf = open_buf_writer(path)?;
    writeln!(buf, "{}", draws.names().join("\t"))?;
    for row in draws.rows() {
        let line: Vec<String> = row.iter().map(|x| format!("{}", x)).collect();
        writeln!(buf, "{}", line.join("\t"))?;
    }
    buf.flush()?;
    info!("Wrote {} x {} draws: {}", draws.nrows(), draws.ncols(), path);
    Ok(())
}

pub fn read_draws(path: &str) -> Result<PosteriorDraws> {
    let lines = read_data_lines(path)?;
    let (_, header) = lines
        .first()
        .ok_or(anyhow::anyhow!("{}: empty draws file", path))?;
    let names: Vec<Box<str>> = fields(header).into_iter().map(Box::from).collect();

    let mut rows = Vec::with_capacity(lines.len().saturating_sub(1));
    for (lineno, line) in lines.iter().skip(1) {
        let row = fields(line)
            .into_iter()
            .map(|w| w.parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| anyhow::anyhow!("{}:{}: {}", path, lineno, e))?;
        rows.push(row);
    }

    let draws = PosteriorDraws::from_named_rows(names, rows)
        .map_err(|e| anyhow::anyhow!("{}: {}", path, e))?;
    info!("Read {} x {} draws from {}", draws.nrows(), draws.ncols(), path);
    Ok(draws)
}

/// `[model]  group  label  estimate  lower  upper`
///
/// The `model` column is written only when `model` is given.
pub fn write_summary_rows(
    buf: &mut dyn Write,
    model: Option<&str>,
    rows: &[SummaryRow],
) -> Result<()> {
    for r in rows {
        if let Some(m) = model {
            write!(buf, "{}\t", m)?;
        }
        writeln!(
            buf,
            "{}\t{}\t{}\t{}\t{}",
            r.group,
            r.label,
            r.estimate(),
            r.lower(),
            r.upper()
        )?;
    }
    Ok(())
}

pub fn write_summary(
    models: &[(Box<str>, Vec<SummaryRow>)],
    label_header: &str,
    path: &str,
) -> Result<()> {
    let mut buf = open_buf_writer(path)?;
    let with_model = models.len() > 1;
    if with_model {
        write!(buf, "model\t")?;
    }
    writeln!(buf, "group\t{}\testimate\tlower\tupper", label_header)?;
    for (name, rows) in models {
        write_summary_rows(&mut buf, with_model.then_some(name.as_ref()), rows)?;
    }
    buf.flush()?;
    Ok(())
}

/// `coefficient  value`
pub fn write_truth(names: &[Box<str>], values: &[f64], path: &str) -> Result<()> {
    let mut buf = open_buf_writer(path)?;
    writeln!(buf, "coefficient\tvalue")?;
    for (name, value) in names.iter().zip(values) {
        writeln!(buf, "{}\t{}", name, value)?;
    }
    buf.flush()?;
    Ok(())
}

/// `subject  group  time  estimate  lower  upper` for each imputed response
pub fn write_imputed(
    imputed: &[(ImputedResponse, mcmc_util::Summary)],
    path: &str,
) -> Result<()> {
    let mut buf = open_buf_writer(path)?;
    writeln!(buf, "subject\tgroup\ttime\testimate\tlower\tupper")?;
    for (imp, s) in imputed {
        let rec = &imp.record;
        writeln!(
            buf,
            "{}\t{}\t{}\t{}\t{}\t{}",
            rec.subject, rec.arm, rec.visit, s.estimate, s.lower, s.upper
        )?;
    }
    buf.flush()?;
    Ok(())
}
