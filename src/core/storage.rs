use crate::actions::StorageAction;
use crate::data::Data;
use crate::errors::Result;
use async_trait::async_trait;

#[async_trait]
pub trait Storage: Send + Sync {
    /// Persist `payload`. `None` means the action carried no payload at all.
    async fn save(&self, payload: Option<&Data>) -> Result<()>;

    async fn perform(&self, action: &StorageAction, payload: Option<&Data>) -> Result<()> {
        match action {
            StorageAction::SaveData(_) => self.save(payload).await,
        }
    }
}
