//! Fingerprint and face template operations
//!
//! Templates are addressed by user uid and slot: fingerprints use slots
//! 0..=9 and faces 50..=54. A slot is read with its own bulk transfer, so
//! reading every slot of a user costs one round trip per slot.

use bytes::Bytes;
use tracing::{debug, info, warn};

use zkrust_core::Command;
use zkrust_types::template::{first_free_slot, request_payload};
use zkrust_types::{BiometricTemplate, TemplateKind};

use crate::device::Device;
use crate::dispatch::StreamLayout;
use crate::error::{Error, Result};

impl Device {
    /// Read one template slot
    ///
    /// Returns `None` when the slot is empty or the terminal refuses the
    /// transfer.
    pub async fn get_template(
        &mut self,
        kind: TemplateKind,
        uid: u16,
        slot: u8,
    ) -> Result<Option<BiometricTemplate>> {
        kind.check_slot(slot)?;

        let raw = self
            .bulk(Command::UserTempRrq, &request_payload(uid, slot), StreamLayout::Template)
            .await?;
        Ok(BiometricTemplate::from_stream(uid, slot, raw))
    }

    /// Read every enrolled template of one kind
    pub async fn get_templates(
        &mut self,
        kind: TemplateKind,
        uid: u16,
    ) -> Result<Vec<BiometricTemplate>> {
        let mut templates = Vec::new();
        for slot in kind.slots() {
            if let Some(template) = self.get_template(kind, uid, slot).await? {
                templates.push(template);
            }
        }

        debug!(uid, %kind, count = templates.len(), "Read templates");
        Ok(templates)
    }

    pub async fn get_fingerprints(&mut self, uid: u16) -> Result<Vec<BiometricTemplate>> {
        self.get_templates(TemplateKind::Fingerprint, uid).await
    }

    pub async fn get_faces(&mut self, uid: u16) -> Result<Vec<BiometricTemplate>> {
        self.get_templates(TemplateKind::Face, uid).await
    }

    /// Write templates for `uid`, replacing whatever occupies their slots
    ///
    /// Templates whose slot does not belong to `kind` are skipped. Returns
    /// how many were written.
    pub async fn set_templates(
        &mut self,
        kind: TemplateKind,
        uid: u16,
        templates: &[BiometricTemplate],
    ) -> Result<usize> {
        let mut written = 0;

        for template in templates {
            let template =
                match BiometricTemplate::new(kind, uid, template.slot_id, template.raw.clone()) {
                    Ok(template) => template,
                    Err(e) => {
                        warn!(uid, slot = template.slot_id, error = %e, "Skipping template");
                        continue;
                    }
                };

            match self.replace_template(kind, &template).await {
                Ok(()) => written += 1,
                Err(e @ Error::CommandFailed { .. }) => {
                    warn!(uid, slot = template.slot_id, error = %e, "Template not written");
                }
                Err(e) => return Err(e),
            }
        }

        info!(uid, %kind, written, "Templates written");
        Ok(written)
    }

    /// Delete the given slots of `uid`
    ///
    /// Empty slots and slots outside `kind` are skipped. Returns how many
    /// templates are confirmed gone.
    pub async fn remove_templates(
        &mut self,
        kind: TemplateKind,
        uid: u16,
        slots: &[u8],
    ) -> Result<usize> {
        let mut removed = 0;

        for &slot in slots {
            if kind.check_slot(slot).is_err() {
                warn!(uid, slot, %kind, "Slot out of range");
                continue;
            }
            if self.get_template(kind, uid, slot).await?.is_none() {
                continue;
            }
            if self.remove_slot(kind, uid, slot).await? {
                removed += 1;
            }
        }

        info!(uid, %kind, removed, "Templates removed");
        Ok(removed)
    }

    /// Store a fingerprint in a chosen slot, replacing any existing one
    pub async fn set_fingerprint(&mut self, uid: u16, slot: u8, raw: impl Into<Bytes>) -> Result<()> {
        let template = BiometricTemplate::new(TemplateKind::Fingerprint, uid, slot, raw)?;
        self.replace_template(TemplateKind::Fingerprint, &template).await
    }

    /// Store a face in a chosen slot, replacing any existing one
    pub async fn set_face(&mut self, uid: u16, slot: u8, raw: impl Into<Bytes>) -> Result<()> {
        let template = BiometricTemplate::new(TemplateKind::Face, uid, slot, raw)?;
        self.replace_template(TemplateKind::Face, &template).await
    }

    /// Store a fingerprint in the lowest free slot and return that slot
    pub async fn enroll_fingerprint(&mut self, uid: u16, raw: impl Into<Bytes>) -> Result<u8> {
        self.enroll(TemplateKind::Fingerprint, uid, raw.into()).await
    }

    /// Store a face in the lowest free slot and return that slot
    pub async fn enroll_face(&mut self, uid: u16, raw: impl Into<Bytes>) -> Result<u8> {
        self.enroll(TemplateKind::Face, uid, raw.into()).await
    }

    /// Read every slot of `kind` and write into the lowest free one
    ///
    /// Nothing is written when all slots are occupied.
    async fn enroll(&mut self, kind: TemplateKind, uid: u16, raw: Bytes) -> Result<u8> {
        if raw.is_empty() {
            return Err(zkrust_types::Error::Validation("template data is empty".into()).into());
        }

        let mut occupied = Vec::new();
        for slot in kind.slots() {
            if self.inspect_slot(kind, uid, slot).await?.is_some() {
                occupied.push(slot);
            }
        }

        let slot = first_free_slot(kind, &occupied).ok_or(Error::SlotsExhausted(kind))?;
        let template = BiometricTemplate::new(kind, uid, slot, raw)?;
        self.write_template(&template).await?;

        info!(uid, slot, %kind, "Enrolled template");
        Ok(slot)
    }

    async fn replace_template(&mut self, kind: TemplateKind, template: &BiometricTemplate) -> Result<()> {
        let (uid, slot) = (template.owner_uid, template.slot_id);

        if self.inspect_slot(kind, uid, slot).await?.is_some() && !self.remove_slot(kind, uid, slot).await? {
            return Err(Error::InvalidResponse(format!(
                "{} slot {} of user {} is still occupied after delete",
                kind, slot, uid
            )));
        }

        self.write_template(template).await
    }

    async fn write_template(&mut self, template: &BiometricTemplate) -> Result<()> {
        debug!(uid = template.owner_uid, slot = template.slot_id, size = template.size, "Writing template");
        self.general(Command::UserTempWrq, &template.encode())
            .await
            .map(drop)
    }

    /// Delete one slot and check that it reads back empty
    async fn remove_slot(&mut self, kind: TemplateKind, uid: u16, slot: u8) -> Result<bool> {
        match self
            .general(Command::DeleteUserTemp, &request_payload(uid, slot))
            .await
        {
            Ok(_) => {}
            Err(e @ Error::CommandFailed { .. }) => {
                warn!(uid, slot, error = %e, "Template delete refused");
                return Ok(false);
            }
            Err(e) => return Err(e),
        }

        Ok(self.inspect_slot(kind, uid, slot).await?.is_none())
    }

    /// Read a slot before writing to it
    ///
    /// Unlike [`Device::get_template`], a lost or cut-short reply is an error
    /// rather than an empty slot.
    async fn inspect_slot(
        &mut self,
        kind: TemplateKind,
        uid: u16,
        slot: u8,
    ) -> Result<Option<BiometricTemplate>> {
        kind.check_slot(slot)?;

        let raw = self
            .bulk_strict(Command::UserTempRrq, &request_payload(uid, slot), StreamLayout::Template)
            .await?;
        Ok(BiometricTemplate::from_stream(uid, slot, raw))
    }
}
