pub mod create_promotion_command;
pub mod delete_promotion_command;
pub mod record_redemption_command;
pub mod resync_promotion_status_command;
pub mod share_promotion_command;
pub mod toggle_promotion_status_command;
pub mod update_promotion_command;

// Re-export commands for easier access
pub use create_promotion_command::CreatePromotionCommand;
pub use delete_promotion_command::DeletePromotionCommand;
pub use record_redemption_command::RecordRedemptionCommand;
pub use resync_promotion_status_command::ResyncPromotionStatusCommand;
pub use share_promotion_command::SharePromotionCommand;
pub use toggle_promotion_status_command::TogglePromotionStatusCommand;
pub use update_promotion_command::UpdatePromotionCommand;
