//! CSV sinks for per-page flows, cross-page flows, and benchmark data.
//! All files use `|` as the field delimiter.

use crate::errors::TaintResult;
use crate::storage::{FlowRecord, InterPageFlow};
use csv::WriterBuilder;
use std::fs::File;
use std::path::Path;

pub struct ResultWriter {
    inner: csv::Writer<File>,
}

impl ResultWriter {
    pub fn create(path: &Path) -> TaintResult<Self> {
        let mut inner = WriterBuilder::new().delimiter(b'|').from_path(path)?;
        inner.write_record(["page_name", "page_method", "ident", "source", "sink"])?;
        inner.flush()?;
        Ok(Self { inner })
    }

    pub fn write_flow(&mut self, page: &str, flow: &FlowRecord) -> TaintResult<()> {
        self.inner
            .write_record([page, &flow.method, &flow.ident, &flow.source, &flow.sink])?;
        self.inner.flush()?;
        Ok(())
    }
}

pub struct InterPageWriter {
    inner: csv::Writer<File>,
}

impl InterPageWriter {
    pub fn create(path: &Path) -> TaintResult<Self> {
        let mut inner = WriterBuilder::new().delimiter(b'|').from_path(path)?;
        inner.write_record(["from_page", "to_page", "event_name", "source", "sink"])?;
        Ok(Self { inner })
    }

    pub fn write_flow(&mut self, flow: &InterPageFlow) -> TaintResult<()> {
        self.inner.write_record([
            &flow.from_page,
            &flow.to_page,
            &flow.event_name,
            &flow.source,
            &flow.sink,
        ])?;
        Ok(())
    }

    pub fn finish(mut self) -> TaintResult<()> {
        self.inner.flush()?;
        Ok(())
    }
}

pub struct BenchWriter {
    inner: csv::Writer<File>,
}

impl BenchWriter {
    pub fn create(path: &Path) -> TaintResult<Self> {
        let mut inner = WriterBuilder::new().delimiter(b'|').from_path(path)?;
        inner.write_record(["page", "start", "end"])?;
        Ok(Self { inner })
    }

    pub fn write_row(&mut self, page: &str, start: u64, end: u64) -> TaintResult<()> {
        self.inner
            .write_record([page, &start.to_string(), &end.to_string()])?;
        Ok(())
    }

    pub fn finish(mut self) -> TaintResult<()> {
        self.inner.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_csv_is_pipe_delimited_with_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let mut w = ResultWriter::create(&path).unwrap();
        w.write_flow(
            "foo",
            &FlowRecord {
                method: "onLoad".into(),
                ident: "v".into(),
                source: "wx.getStorageSync".into(),
                sink: "wx.request".into(),
            },
        )
        .unwrap();
        drop(w);
        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("page_name|page_method|ident|source|sink"));
        assert_eq!(lines.next(), Some("foo|onLoad|v|wx.getStorageSync|wx.request"));
    }

    #[test]
    fn inter_page_csv_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inter.csv");
        let mut w = InterPageWriter::create(&path).unwrap();
        w.write_flow(&InterPageFlow {
            from_page: "a".into(),
            to_page: "b".into(),
            event_name: "msg".into(),
            source: "userData".into(),
            sink: "wx.request".into(),
        })
        .unwrap();
        w.finish().unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("a|b|msg|userData|wx.request"));
    }

    #[test]
    fn bench_csv_has_epoch_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bench.csv");
        let mut w = BenchWriter::create(&path).unwrap();
        w.write_row("foo", 10, 20).unwrap();
        w.finish().unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("page|start|end\n"));
        assert!(text.contains("foo|10|20"));
    }
}
