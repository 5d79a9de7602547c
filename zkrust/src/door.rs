//! Door relay operations

use tracing::{debug, info};

use zkrust_core::Command;
use zkrust_types::door::status_request;
use zkrust_types::{DoorAction, DoorStatus};

use crate::device::Device;
use crate::error::Result;

impl Device {
    /// Send a relay action to a door
    pub async fn door_control(&mut self, door_id: u8, action: DoorAction) -> Result<()> {
        info!(door_id, %action, "Door control");
        self.general(Command::Unlock, &action.payload(door_id))
            .await
            .map(drop)
    }

    pub async fn open_door(&mut self, door_id: u8) -> Result<()> {
        self.door_control(door_id, DoorAction::Open).await
    }

    pub async fn close_door(&mut self, door_id: u8) -> Result<()> {
        self.door_control(door_id, DoorAction::Close).await
    }

    pub async fn lock_door(&mut self, door_id: u8) -> Result<()> {
        self.door_control(door_id, DoorAction::Lock).await
    }

    pub async fn unlock_door(&mut self, door_id: u8) -> Result<()> {
        self.door_control(door_id, DoorAction::Unlock).await
    }

    /// Query the relay and sensor state of a door
    ///
    /// Fails with a record error when the reply carries fewer than three
    /// bytes.
    pub async fn get_door_status(&mut self, door_id: u8) -> Result<DoorStatus> {
        let payload = self
            .general(Command::DoorStateRrq, &status_request(door_id))
            .await?;
        let status = DoorStatus::decode(&payload)?;
        debug!(door_id, %status, "Door status");
        Ok(status)
    }
}
