use crate::{
    contract::{ContractDocument, Interaction, SpecVersion},
    error::Error,
};

/// Interactions accumulated by a consumer test run, in the order they were recorded.
#[derive(Debug, Clone, Default)]
pub struct InteractionLedger {
    interactions: Vec<Interaction>,
    spec_version: SpecVersion,
}

impl InteractionLedger {
    pub fn new(spec_version: SpecVersion) -> Self {
        Self {
            interactions: Vec::new(),
            spec_version,
        }
    }

    pub fn add_interaction(&mut self, interaction: Interaction) {
        self.interactions.push(interaction);
    }

    pub fn all_interactions(&self) -> &[Interaction] {
        &self.interactions
    }

    pub fn is_empty(&self) -> bool {
        self.interactions.is_empty()
    }

    pub fn to_document<C: Into<String>, P: Into<String>>(
        &self,
        consumer: C,
        provider: P,
    ) -> Result<ContractDocument, Error> {
        if self.interactions.is_empty() {
            return Err(Error::EmptyLedger);
        }

        Ok(ContractDocument::new(
            consumer,
            provider,
            self.interactions.clone(),
            self.spec_version,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::InteractionBuilder;

    #[test]
    fn test_empty_ledger_is_rejected() {
        let ledger = InteractionLedger::default();

        assert!(matches!(
            ledger.to_document("consumer", "provider"),
            Err(Error::EmptyLedger)
        ));
    }

    #[test]
    fn test_interactions_keep_call_order_without_deduplication() {
        let mut ledger = InteractionLedger::new(SpecVersion::V2);
        ledger.add_interaction(InteractionBuilder::new("first").build());
        ledger.add_interaction(InteractionBuilder::new("second").build());
        ledger.add_interaction(InteractionBuilder::new("first").build());

        let document = ledger.to_document("consumer", "provider").unwrap();
        let descriptions: Vec<_> = document
            .interactions
            .iter()
            .map(|interaction| interaction.description.as_str())
            .collect();

        assert_eq!(descriptions, vec!["first", "second", "first"]);
        assert_eq!(document.consumer.name, "consumer");
        assert_eq!(document.metadata.pact_specification.version, SpecVersion::V2);
    }
}
