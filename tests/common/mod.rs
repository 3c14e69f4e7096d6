use std::io::Write;
use tempfile::NamedTempFile;

pub const OPS_HEADER: &str =
    "op,out_batch_no,batch_name,out_detail_no,amount,recipient,remark,provider_code";

/// Writes an ops CSV with the standard header plus the given rows.
pub fn ops_file(rows: &[&str]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "{OPS_HEADER}").unwrap();
    for row in rows {
        writeln!(file, "{row}").unwrap();
    }
    file.flush().unwrap();
    file
}
