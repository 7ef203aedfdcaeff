//! Domain constants

/// Webhook event name that may carry a lead status change.
pub const WEBHOOK_EVENT_RECORD_UPDATE: &str = "record.update";

/// CRM module the sync pipeline listens to.
pub const WEBHOOK_MODULE_LEADS: &str = "Leads";

/// Lead status that triggers the billing synchronization pipeline.
pub const TRIGGER_LEAD_STATUS: &str = "Ready for Finance Setup";

/// Lead status written back to the CRM once billing setup succeeds.
pub const COMPLETED_LEAD_STATUS: &str = "Finance Setup Complete";

/// Product handle used when none is configured.
pub const DEFAULT_PRODUCT_HANDLE: &str = "default-hr-package";

/// Billing cycle applied to every subscription.
pub const DEFAULT_BILLING_CYCLE: &str = "monthly";

/// Default subscription quantity.
pub const DEFAULT_SUBSCRIPTION_QUANTITY: u32 = 1;
