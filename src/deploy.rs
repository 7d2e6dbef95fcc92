//! Reference deployment of the full platform onto a ledger.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

use crate::account::{CastVariant, DefaultImplementation};
use crate::config::LayerConfig;
use crate::error::{LayerError, Result};
use crate::ledger::{BuiltinCode, Implementation, Ledger};
use crate::types::{Address, Selector};

/// Addresses produced by [`Deployment::standard`].
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Deployment {
    pub master: Address,
    pub index: Address,
    pub list: Address,
    pub implementations: Address,
    pub connectors: Address,
    pub account_template: Address,
    pub default_implementation: Address,
    pub implementation_m1: Address,
    pub implementation_m2: Address,
    pub implementation_beta: Address,
    pub flash_pool: Address,
    pub flash_amount: u128,
    pub connector_addresses: BTreeMap<String, Address>,
    pub deployed_at: String,
}

impl Deployment {
    /// Deploy every registry, the account template, the built-in modules and
    /// the configured reference connectors, with `master` governing.
    pub fn standard(ledger: &mut Ledger, master: Address, config: &LayerConfig) -> Result<Self> {
        let index = ledger.deploy_index(master)?;
        let list = ledger.deploy_list(master)?;
        let implementations = ledger.deploy_implementations(master);
        let connectors = ledger.deploy_connectors(master);
        let account_template = ledger.deploy_account_template(master, implementations)?;
        ledger.set_basics(master, master, list, account_template, connectors)?;

        let default_implementation = ledger.deploy_builtin(master, BuiltinCode::DefaultImplementation);
        ledger.set_default_implementation(master, implementations, default_implementation)?;

        let flash_amount = u128::from(config.deployment.flash_loan_amount);
        let flash_pool = Address::derive(&index, u64::MAX);
        ledger.fund(flash_pool, flash_amount);

        let routes = |variant: CastVariant| {
            variant
                .signatures()
                .into_iter()
                .map(Selector::from_signature)
                .collect::<Vec<_>>()
        };
        let m1 = ledger.deploy_builtin(master, BuiltinCode::CastM1);
        ledger.add_implementation(master, implementations, m1, routes(CastVariant::M1))?;
        let m2 = ledger.deploy_builtin(
            master,
            BuiltinCode::CastM2 { pool: flash_pool, amount: flash_amount },
        );
        ledger.add_implementation(master, implementations, m2, routes(CastVariant::M2))?;
        let beta = ledger.deploy_builtin(master, BuiltinCode::CastBeta);
        ledger.add_implementation(master, implementations, beta, routes(CastVariant::Beta))?;

        let mut connector_addresses = BTreeMap::new();
        for name in &config.deployment.connectors {
            let builtin = BuiltinCode::connector_named(name)
                .ok_or_else(|| LayerError::Config(format!("unknown reference connector '{}'", name)))?;
            connector_addresses.insert(name.clone(), ledger.deploy_builtin(master, builtin));
        }
        let (names, addresses): (Vec<String>, Vec<Address>) =
            connector_addresses.iter().map(|(n, a)| (n.clone(), *a)).unzip();
        if !names.is_empty() {
            ledger.add_connectors(master, connectors, &names, &addresses)?;
        }

        info!(
            %index,
            %list,
            %implementations,
            %connectors,
            default = DefaultImplementation.name(),
            "platform deployed"
        );
        Ok(Self {
            master,
            index,
            list,
            implementations,
            connectors,
            account_template,
            default_implementation,
            implementation_m1: m1,
            implementation_m2: m2,
            implementation_beta: beta,
            flash_pool,
            flash_amount,
            connector_addresses,
            deployed_at: chrono::Utc::now().to_rfc3339(),
        })
    }

    pub fn connector(&self, name: &str) -> Option<Address> {
        self.connector_addresses.get(name).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_deployment_wires_everything() {
        let mut ledger = Ledger::new();
        let master = Address::from_label("master");
        let d = Deployment::standard(&mut ledger, master, &LayerConfig::default()).unwrap();

        assert_eq!(ledger.index().master(), master);
        assert_eq!(ledger.index().version_count(), 1);
        assert_eq!(ledger.index().account(1), d.account_template);
        assert_eq!(ledger.index().connectors(1), d.connectors);

        let impls = ledger.implementations(&d.implementations).unwrap();
        assert_eq!(impls.default_implementation(), d.default_implementation);
        let cast = Selector::from_signature("cast(string[],bytes[],address)");
        assert_eq!(impls.get_implementation(&cast), d.implementation_m1);
        assert_eq!(
            impls.get_implementation(&Selector::from_signature("connectorsM2()")),
            d.implementation_m2
        );
        assert_eq!(impls.get_implementation_sigs(&d.implementation_m1).len(), 2);
        assert_eq!(
            impls.get_implementation(&Selector::from_signature("isAuth(address)")),
            d.default_implementation
        );

        let registry = ledger.connectors(&d.connectors).unwrap();
        assert_eq!(registry.entries().count(), 4);
        assert_eq!(registry.connector("auth"), d.connector("auth").unwrap());
        assert_eq!(ledger.balance(&d.flash_pool), d.flash_amount);
    }

    #[test]
    fn test_unknown_connector_name_is_a_config_error() {
        let mut ledger = Ledger::new();
        let mut config = LayerConfig::default();
        config.deployment.connectors.push("compound".into());
        let err = Deployment::standard(&mut ledger, Address::from_label("m"), &config).unwrap_err();
        assert!(matches!(err, LayerError::Config(_)));
    }
}
