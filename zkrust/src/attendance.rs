//! Attendance log operations

use chrono::NaiveDate;
use tracing::{debug, info};

use zkrust_core::Command;
use zkrust_types::attendance::most_recent;
use zkrust_types::{AttendanceRecord, decode_attendance};

use crate::device::Device;
use crate::dispatch::StreamLayout;
use crate::error::Result;

impl Device {
    /// Read the whole attendance log
    ///
    /// Records come back in device order. Chunks with an impossible
    /// timestamp are skipped, and a refused transfer yields an empty list.
    pub async fn get_attendance(&mut self) -> Result<Vec<AttendanceRecord>> {
        debug!("Reading attendance log...");
        let stream = self
            .bulk(Command::AttLogRrq, &[], StreamLayout::Table)
            .await?;

        let records = decode_attendance(&stream);
        info!("Read {} attendance records", records.len());
        Ok(records)
    }

    /// The `limit` newest records, newest first
    pub async fn get_recent_attendance(&mut self, limit: usize) -> Result<Vec<AttendanceRecord>> {
        Ok(most_recent(self.get_attendance().await?, limit))
    }

    /// Records punched on `date`
    pub async fn get_attendance_on(&mut self, date: NaiveDate) -> Result<Vec<AttendanceRecord>> {
        let mut records = self.get_attendance().await?;
        records.retain(|r| r.is_on(date));
        Ok(records)
    }

    pub async fn clear_attendance(&mut self) -> Result<()> {
        info!("Clearing attendance log");
        self.general(Command::ClearAttLog, &[]).await.map(drop)
    }
}
