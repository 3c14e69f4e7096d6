use crate::domain::batch::TransferBatch;
use crate::error::Result;
use std::io::Write;

/// Writes the final reconciliation report: one row per detail with the
/// owning batch's status alongside.
pub struct ReportWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> ReportWriter<W> {
    pub fn new(destination: W) -> Self {
        Self {
            writer: csv::WriterBuilder::new().from_writer(destination),
        }
    }

    pub fn write_batches(&mut self, batches: &[TransferBatch]) -> Result<()> {
        self.writer.write_record([
            "out_batch_no",
            "batch_status",
            "out_detail_no",
            "detail_status",
            "amount",
        ])?;
        for batch in batches {
            for detail in &batch.details {
                self.writer.write_record([
                    batch.out_batch_no.as_str(),
                    batch.status.as_str(),
                    detail.out_detail_no.as_str(),
                    detail.status.as_str(),
                    &detail.amount.to_string(),
                ])?;
            }
        }
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::batch::DetailSpec;
    use crate::domain::status::DetailStatus;

    #[test]
    fn test_report_rows() {
        let mut batch = TransferBatch::create(
            "B1",
            "payroll",
            None,
            vec![
                DetailSpec {
                    out_detail_no: "D1".to_string(),
                    amount: 1000,
                    recipient: "openid-1".to_string(),
                    remark: None,
                },
                DetailSpec {
                    out_detail_no: "D2".to_string(),
                    amount: 500,
                    recipient: "openid-2".to_string(),
                    remark: None,
                },
            ],
        )
        .unwrap();
        batch.detail_mut("D1").unwrap().status = DetailStatus::Success;

        let mut out = Vec::new();
        ReportWriter::new(&mut out).write_batches(&[batch]).unwrap();

        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "out_batch_no,batch_status,out_detail_no,detail_status,amount"
        );
        assert_eq!(lines.next().unwrap(), "B1,PROCESSING,D1,SUCCESS,1000");
        assert_eq!(lines.next().unwrap(), "B1,PROCESSING,D2,INIT,500");
    }
}
