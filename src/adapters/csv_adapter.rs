//! CSV bar source and trade log adapters.

use crate::domain::bar::Bar;
use crate::domain::error::ScalptraderError;
use crate::domain::indicator::EnrichedBar;
use crate::domain::position::{round_price, Trade};
use crate::ports::bar_source::BarSource;
use crate::ports::trade_sink::TradeSink;
use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%:z";

pub const TRADE_LOG_HEADER: [&str; 8] = [
    "EntryTime",
    "Side",
    "EntryPrice",
    "ExitTime",
    "ExitPrice",
    "Reason",
    "PnL_Points",
    "PnL_INR",
];

/// Reads `datetime,open,high,low,close,volume` rows from one file. Columns
/// are located by header name, so their order does not matter.
pub struct CsvBarSource {
    path: PathBuf,
    utc_offset: FixedOffset,
}

impl CsvBarSource {
    /// `utc_offset` applies to timestamps written without an offset.
    pub fn new(path: impl Into<PathBuf>, utc_offset: FixedOffset) -> Self {
        Self {
            path: path.into(),
            utc_offset,
        }
    }

    fn parse_timestamp(&self, s: &str) -> Result<DateTime<FixedOffset>, ScalptraderError> {
        let s = s.trim();
        if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
            return Ok(ts);
        }
        if let Ok(ts) = DateTime::parse_from_str(s, TIMESTAMP_FORMAT) {
            return Ok(ts);
        }
        let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
            .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S"))
            .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M"))
            .map_err(|e| ScalptraderError::data(format!("invalid datetime '{}': {}", s, e)))?;
        self.utc_offset
            .from_local_datetime(&naive)
            .single()
            .ok_or_else(|| ScalptraderError::data(format!("ambiguous datetime '{}'", s)))
    }
}

struct Columns {
    datetime: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: usize,
}

impl Columns {
    fn locate(headers: &csv::StringRecord) -> Result<Self, ScalptraderError> {
        let find = |names: &[&str]| {
            headers
                .iter()
                .position(|h| names.iter().any(|n| h.trim().eq_ignore_ascii_case(n)))
                .ok_or_else(|| ScalptraderError::data(format!("missing {} column", names[0])))
        };
        Ok(Columns {
            datetime: find(&["datetime", "timestamp", "date"])?,
            open: find(&["open"])?,
            high: find(&["high"])?,
            low: find(&["low"])?,
            close: find(&["close"])?,
            volume: find(&["volume"])?,
        })
    }
}

fn field<'r>(
    record: &'r csv::StringRecord,
    index: usize,
    name: &str,
    line: usize,
) -> Result<&'r str, ScalptraderError> {
    record
        .get(index)
        .map(str::trim)
        .ok_or_else(|| ScalptraderError::data(format!("row {}: missing {} value", line, name)))
}

/// Volume is a whole, non-negative contract count.
fn parse_volume(
    record: &csv::StringRecord,
    index: usize,
    line: usize,
) -> Result<u64, ScalptraderError> {
    let raw = field(record, index, "volume", line)?;
    raw.parse::<u64>().map_err(|e| {
        ScalptraderError::data(format!("row {}: invalid volume '{}': {}", line, raw, e))
    })
}

fn price(
    record: &csv::StringRecord,
    index: usize,
    name: &str,
    line: usize,
) -> Result<f64, ScalptraderError> {
    let raw = field(record, index, name, line)?;
    let value: f64 = raw.parse().map_err(|e| {
        ScalptraderError::data(format!("row {}: invalid {} value '{}': {}", line, name, raw, e))
    })?;
    if !value.is_finite() {
        return Err(ScalptraderError::data(format!(
            "row {}: {} is not finite",
            line, name
        )));
    }
    Ok(value)
}

impl BarSource for CsvBarSource {
    fn load_bars(&self) -> Result<Vec<Bar>, ScalptraderError> {
        let content = fs::read_to_string(&self.path).map_err(|e| {
            ScalptraderError::data(format!("failed to read {}: {}", self.path.display(), e))
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let headers = rdr
            .headers()
            .map_err(|e| ScalptraderError::data(format!("CSV header error: {}", e)))?
            .clone();
        let cols = Columns::locate(&headers)?;

        let mut bars = Vec::new();
        for (i, result) in rdr.records().enumerate() {
            let line = i + 2;
            let record =
                result.map_err(|e| ScalptraderError::data(format!("CSV parse error: {}", e)))?;

            let timestamp = self.parse_timestamp(field(&record, cols.datetime, "datetime", line)?)?;
            let volume = parse_volume(&record, cols.volume, line)?;

            bars.push(Bar {
                timestamp,
                open: price(&record, cols.open, "open", line)?,
                high: price(&record, cols.high, "high", line)?,
                low: price(&record, cols.low, "low", line)?,
                close: price(&record, cols.close, "close", line)?,
                volume,
            });
        }

        Ok(normalize(bars))
    }
}

/// Sort ascending by timestamp; of several rows sharing a timestamp the last
/// one read wins.
fn normalize(mut bars: Vec<Bar>) -> Vec<Bar> {
    bars.sort_by_key(|b| b.timestamp);
    let mut out: Vec<Bar> = Vec::with_capacity(bars.len());
    let mut duplicates = 0usize;
    for bar in bars {
        match out.last_mut() {
            Some(last) if last.timestamp == bar.timestamp => {
                *last = bar;
                duplicates += 1;
            }
            _ => out.push(bar),
        }
    }
    if duplicates > 0 {
        tracing::warn!(duplicates, "dropped bars with duplicate timestamps");
    }
    out
}

/// Append-only CSV trade log. The header is written only when the file is
/// new or empty, so repeated runs accumulate rows in one file.
pub struct CsvTradeLog {
    writer: csv::Writer<File>,
}

impl CsvTradeLog {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ScalptraderError> {
        let path = path.as_ref();
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let needs_header = file.metadata()?.len() == 0;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        if needs_header {
            writer
                .write_record(TRADE_LOG_HEADER)
                .map_err(|e| write_error(path, e))?;
            writer.flush()?;
        }
        Ok(Self { writer })
    }

    pub fn record_all(&mut self, trades: &[Trade]) -> Result<(), ScalptraderError> {
        for trade in trades {
            self.record(trade)?;
        }
        Ok(())
    }
}

fn write_error(path: &Path, e: csv::Error) -> ScalptraderError {
    ScalptraderError::data(format!("failed to write {}: {}", path.display(), e))
}

fn money(value: f64) -> String {
    format!("{:.2}", round_price(value))
}

impl TradeSink for CsvTradeLog {
    fn record(&mut self, trade: &Trade) -> Result<(), ScalptraderError> {
        self.writer
            .write_record([
                trade.entry_time.format(TIMESTAMP_FORMAT).to_string(),
                trade.side.label().to_string(),
                money(trade.entry_price),
                trade.exit_time.format(TIMESTAMP_FORMAT).to_string(),
                money(trade.exit_price),
                trade.exit_reason.label().to_string(),
                money(trade.pnl_points),
                money(trade.pnl_currency),
            ])
            .map_err(|e| ScalptraderError::data(format!("failed to write trade: {}", e)))?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Write an enriched sequence as CSV. Undefined indicator cells are blank.
pub fn write_enriched<W: Write>(out: W, bars: &[EnrichedBar]) -> Result<(), ScalptraderError> {
    let mut writer = csv::Writer::from_writer(out);
    let csv_err = |e: csv::Error| ScalptraderError::data(format!("failed to write CSV: {}", e));

    writer
        .write_record([
            "datetime", "open", "high", "low", "close", "volume", "ema", "macd", "signal",
            "histogram", "atr",
        ])
        .map_err(csv_err)?;

    for eb in bars {
        let bar = &eb.bar;
        let mut row = vec![
            bar.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            bar.open.to_string(),
            bar.high.to_string(),
            bar.low.to_string(),
            bar.close.to_string(),
            bar.volume.to_string(),
        ];
        match &eb.indicators {
            Some(ind) => row.extend(
                [
                    ind.ema_fast_momentum,
                    ind.macd,
                    ind.macd_signal,
                    ind.macd_histogram,
                    ind.atr,
                ]
                .iter()
                .map(|v| format!("{:.6}", v)),
            ),
            None => row.extend(std::iter::repeat_n(String::new(), 5)),
        }
        writer.write_record(&row).map_err(csv_err)?;
    }
    writer.flush()?;
    Ok(())
}
