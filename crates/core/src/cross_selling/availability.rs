use tracing::warn;

use crate::criteria::{Criteria, Filter};
use crate::domain::sales_channel::SalesChannelContext;
use crate::ports::SystemConfigService;

pub const HIDE_CLOSEOUT_WHEN_OUT_OF_STOCK: &str =
    "core.listing.hideCloseoutProductsWhenOutOfStock";

/// Reads the closeout flag for the context's sales channel.
///
/// An unset flag and a failed lookup both mean "show closeout products".
pub async fn closeout_hidden<C>(config: &C, context: &SalesChannelContext) -> bool
where
    C: SystemConfigService + ?Sized,
{
    match config.get_bool(HIDE_CLOSEOUT_WHEN_OUT_OF_STOCK, Some(&context.sales_channel_id)).await
    {
        Ok(flag) => flag.unwrap_or(false),
        Err(error) => {
            warn!(
                event_name = "cross_selling.config.lookup_failed",
                correlation_id = %context.correlation_id,
                sales_channel_id = %context.sales_channel_id,
                config_key = HIDE_CLOSEOUT_WHEN_OUT_OF_STOCK,
                error = %error,
                "closeout config lookup failed, closeout products stay visible"
            );
            false
        }
    }
}

pub fn handle_available_stock(criteria: &mut Criteria, hide_closeout: bool) {
    if hide_closeout {
        criteria.add_filter(Filter::ProductCloseout);
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::{closeout_hidden, handle_available_stock, HIDE_CLOSEOUT_WHEN_OUT_OF_STOCK};
    use crate::criteria::{Criteria, Filter};
    use crate::domain::sales_channel::{SalesChannelContext, SalesChannelId};
    use crate::errors::ApplicationError;
    use crate::ports::SystemConfigService;

    struct FixedConfig(Result<Option<bool>, ApplicationError>);

    #[async_trait]
    impl SystemConfigService for FixedConfig {
        async fn get_bool(
            &self,
            key: &str,
            sales_channel_id: Option<&SalesChannelId>,
        ) -> Result<Option<bool>, ApplicationError> {
            assert_eq!(key, HIDE_CLOSEOUT_WHEN_OUT_OF_STOCK);
            assert_eq!(sales_channel_id, Some(&SalesChannelId::from("storefront")));
            self.0.clone()
        }
    }

    fn context() -> SalesChannelContext {
        SalesChannelContext::new(SalesChannelId::from("storefront"))
    }

    #[tokio::test]
    async fn enabled_flag_hides_closeout_products() {
        assert!(closeout_hidden(&FixedConfig(Ok(Some(true))), &context()).await);
    }

    #[tokio::test]
    async fn absent_or_disabled_flag_keeps_closeout_products() {
        assert!(!closeout_hidden(&FixedConfig(Ok(None)), &context()).await);
        assert!(!closeout_hidden(&FixedConfig(Ok(Some(false))), &context()).await);
    }

    #[tokio::test]
    async fn lookup_failure_fails_open() {
        let config = FixedConfig(Err(ApplicationError::Persistence("db down".to_owned())));

        assert!(!closeout_hidden(&config, &context()).await);
    }

    #[test]
    fn closeout_filter_is_appended_only_when_hidden() {
        let mut untouched = Criteria::new();
        handle_available_stock(&mut untouched, false);
        assert_eq!(untouched, Criteria::new());

        let mut filtered = Criteria::new();
        filtered.add_filter(Filter::equals("active", true));
        handle_available_stock(&mut filtered, true);
        assert_eq!(
            filtered.filters,
            vec![Filter::equals("active", true), Filter::ProductCloseout]
        );
    }
}
