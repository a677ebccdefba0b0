mod plain;
mod report;

pub(crate) use plain::PlainTextReport;
pub(crate) use report::RunReport;
