pub mod affiliate;
pub mod affiliate_click;
pub mod affiliate_commission;
pub mod affiliate_link;
pub mod affiliate_withdrawal;
pub mod listing;
pub mod notification_outbox;
pub mod order;
pub mod withdrawal_allocation;

pub use affiliate::Entity as AffiliateEntity;
pub use affiliate_click::Entity as AffiliateClickEntity;
pub use affiliate_commission::Entity as AffiliateCommissionEntity;
pub use affiliate_link::Entity as AffiliateLinkEntity;
pub use affiliate_withdrawal::Entity as AffiliateWithdrawalEntity;
pub use listing::Entity as ListingEntity;
pub use notification_outbox::Entity as NotificationOutboxEntity;
pub use order::Entity as OrderEntity;
pub use withdrawal_allocation::Entity as WithdrawalAllocationEntity;
