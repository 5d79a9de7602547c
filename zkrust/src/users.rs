//! User table operations

use tracing::{debug, info};

use zkrust_core::Command;
use zkrust_core::constants::data_types;
use zkrust_types::{UserRecord, decode_users};

use crate::device::Device;
use crate::dispatch::StreamLayout;
use crate::error::Result;

impl Device {
    /// Read the whole user table
    ///
    /// A refused or broken transfer yields an empty list.
    pub async fn get_users(&mut self) -> Result<Vec<UserRecord>> {
        debug!("Reading user table...");
        let stream = self
            .bulk(Command::UserTempRrq, &[data_types::FCT_USER], StreamLayout::Table)
            .await?;

        let users = decode_users(&stream);
        info!("Read {} users", users.len());
        Ok(users)
    }

    /// Look up one user by uid
    pub async fn get_user(&mut self, uid: u16) -> Result<Option<UserRecord>> {
        Ok(self.get_users().await?.into_iter().find(|u| u.uid == uid))
    }

    /// Create or overwrite the user with the record's uid
    pub async fn set_user(&mut self, user: &UserRecord) -> Result<()> {
        let payload = user.encode()?;
        debug!(uid = user.uid, "Writing user");
        self.general(Command::UserWrq, &payload).await.map(drop)
    }

    pub async fn remove_user(&mut self, uid: u16) -> Result<()> {
        debug!(uid, "Removing user");
        self.general(Command::DeleteUser, &uid.to_le_bytes())
            .await
            .map(drop)
    }

    /// Remove every user and their templates
    pub async fn clear_users(&mut self) -> Result<()> {
        info!("Clearing all users");
        self.general(Command::ClearData, &[]).await.map(drop)
    }

    /// Demote every administrator
    pub async fn clear_admin(&mut self) -> Result<()> {
        info!("Clearing administrators");
        self.general(Command::ClearAdmin, &[]).await.map(drop)
    }

    /// Card number of a user, `None` when the user does not exist
    ///
    /// A user without a card yields `Some("")`.
    pub async fn get_user_card_number(&mut self, uid: u16) -> Result<Option<String>> {
        Ok(self.get_user(uid).await?.map(|u| u.card_no))
    }

    /// Rewrite a user with a new role
    ///
    /// Returns `false` without writing when the user does not exist.
    pub async fn set_user_role(&mut self, uid: u16, role: u8) -> Result<bool> {
        let Some(user) = self.get_user(uid).await? else {
            debug!(uid, "No such user");
            return Ok(false);
        };

        self.set_user(&user.with_role(role)).await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use crate::device::tests::{SESSION, connected, push_table};
    use crate::error::Error;
    use crate::mock::MockTransport;
    use bytes::{BufMut, Bytes, BytesMut};
    use pretty_assertions::assert_eq;
    use zkrust_core::Command;
    use zkrust_types::UserRecord;
    use zkrust_types::user::LEVEL_ADMIN;

    fn user_table(users: &[UserRecord]) -> Vec<u8> {
        let mut body = BytesMut::new();
        body.put_u32_le((users.len() * UserRecord::SIZE) as u32);
        for user in users {
            body.put_slice(&user.encode().unwrap());
        }
        body.to_vec()
    }

    fn staff() -> Vec<UserRecord> {
        vec![
            UserRecord::new(1, "1001", "Alice").with_card("123456"),
            UserRecord::new(2, "1002", "Bob"),
        ]
    }

    #[tokio::test]
    async fn test_get_users() {
        let mock = MockTransport::new();
        let mut device = connected(&mock).await;
        push_table(&mock, 1, &user_table(&staff()));

        let users = device.get_users().await.unwrap();

        assert_eq!(users, staff());
        let request = &mock.sent()[1];
        assert_eq!(request.command, Command::UserTempRrq);
        assert_eq!(&request.payload[..], &[5]);
        assert_eq!(mock.remaining(), 0);
    }

    #[tokio::test]
    async fn test_refused_table_read_is_empty() {
        let mock = MockTransport::new();
        let mut device = connected(&mock).await;
        mock.push(Command::AckError, 0, 1, Bytes::new());

        assert!(device.get_users().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_card_number_lookup() {
        let mock = MockTransport::new();
        let mut device = connected(&mock).await;
        push_table(&mock, 1, &user_table(&staff()));
        push_table(&mock, 4, &user_table(&staff()));
        push_table(&mock, 7, &user_table(&staff()));

        assert_eq!(device.get_user_card_number(1).await.unwrap().as_deref(), Some("123456"));
        assert_eq!(device.get_user_card_number(2).await.unwrap().as_deref(), Some(""));
        assert_eq!(device.get_user_card_number(9).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_user_role() {
        let mock = MockTransport::new();
        let mut device = connected(&mock).await;
        push_table(&mock, 1, &user_table(&staff()));
        mock.push(Command::AckOk, SESSION, 4, Bytes::new());

        assert!(device.set_user_role(2, LEVEL_ADMIN).await.unwrap());

        let write = mock.sent().pop().unwrap();
        assert_eq!(write.command, Command::UserWrq);
        let record: [u8; UserRecord::SIZE] = write.payload[..].try_into().unwrap();
        let written = UserRecord::decode(&record);
        assert_eq!(written.uid, 2);
        assert!(written.is_admin());
    }

    #[tokio::test]
    async fn test_set_role_of_missing_user() {
        let mock = MockTransport::new();
        let mut device = connected(&mock).await;
        push_table(&mock, 1, &user_table(&staff()));

        assert!(!device.set_user_role(7, LEVEL_ADMIN).await.unwrap());
        assert!(!mock.sent_commands().contains(&Command::UserWrq));
    }

    #[tokio::test]
    async fn test_set_user_validates_before_sending() {
        let mock = MockTransport::new();
        let mut device = connected(&mock).await;

        let bad = UserRecord::new(3, "1003", "x".repeat(30));
        assert!(matches!(device.set_user(&bad).await, Err(Error::Types(_))));
        assert_eq!(mock.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_remove_user_payload() {
        let mock = MockTransport::new();
        let mut device = connected(&mock).await;
        mock.push(Command::AckOk, SESSION, 1, Bytes::new());

        device.remove_user(0x0102).await.unwrap();

        let sent = mock.sent();
        assert_eq!(sent[1].command, Command::DeleteUser);
        assert_eq!(&sent[1].payload[..], &[0x02, 0x01]);
    }
}
