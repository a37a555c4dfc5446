use crate::error::DescriptorError;
use crate::experiment::{ExperimentDescriptor, ExperimentKind};

/// Validated experiment descriptors, in registration order.
#[derive(Debug, Clone, Default)]
pub struct ExperimentRegistry {
    descriptors: Vec<ExperimentDescriptor>,
}

impl ExperimentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the projectile, pendulum and circuit experiments.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        for kind in ExperimentKind::all() {
            // register logs its own failures
            let _ = registry.register(kind.descriptor());
        }
        registry
    }

    /// Add a descriptor. Invalid descriptors are logged and left out.
    pub fn register(&mut self, descriptor: ExperimentDescriptor) -> Result<(), DescriptorError> {
        let result = if self.get(&descriptor.id).is_some() {
            Err(DescriptorError::DuplicateExperiment(descriptor.id.clone()))
        } else {
            descriptor.validate()
        };

        match result {
            Ok(()) => {
                log::debug!(
                    "Registered experiment '{}' ({} parameters)",
                    descriptor.id,
                    descriptor.control_params.len()
                );
                self.descriptors.push(descriptor);
                Ok(())
            }
            Err(e) => {
                log::error!("Rejected experiment descriptor: {}", e);
                Err(e)
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&ExperimentDescriptor> {
        self.descriptors.iter().find(|d| d.id == id)
    }

    pub fn ids(&self) -> Vec<&str> {
        self.descriptors.iter().map(|d| d.id.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_registry_lists_three_experiments() {
        let registry = ExperimentRegistry::with_builtin();
        assert_eq!(registry.ids(), vec!["projectile", "pendulum", "circuit"]);
        assert_eq!(registry.get("circuit").unwrap().kind, ExperimentKind::Circuit);
    }

    #[test]
    fn invalid_and_duplicate_descriptors_are_excluded() {
        let mut registry = ExperimentRegistry::with_builtin();

        assert_eq!(
            registry.register(ExperimentKind::Pendulum.descriptor()),
            Err(DescriptorError::DuplicateExperiment("pendulum".into()))
        );

        let mut broken = ExperimentKind::Projectile.descriptor();
        broken.id = "slow-projectile".into();
        broken.control_params[2].min = 0.0;
        assert!(registry.register(broken).is_err());
        assert_eq!(registry.len(), 3);

        let mut variant = ExperimentKind::Projectile.descriptor();
        variant.id = "moon-projectile".into();
        variant.control_params[2].default = 1.62;
        registry.register(variant).unwrap();
        assert_eq!(registry.len(), 4);
        assert_eq!(
            registry.get("moon-projectile").unwrap().kind,
            ExperimentKind::Projectile
        );
    }

    #[test]
    fn unflagged_divisor_with_zero_floor_is_rejected() {
        let mut registry = ExperimentRegistry::with_builtin();

        let mut zero_length = ExperimentKind::Pendulum.descriptor();
        zero_length.id = "zero-length-pendulum".into();
        let length = zero_length
            .control_params
            .iter_mut()
            .find(|p| p.id == "length")
            .unwrap();
        length.divisor = false;
        length.min = 0.0;
        length.default = 0.0;

        assert_eq!(
            registry.register(zero_length),
            Err(DescriptorError::DivisorBelowOne {
                experiment: "zero-length-pendulum".into(),
                param: "length".into(),
                min: 0.0,
            })
        );
        assert!(registry.get("zero-length-pendulum").is_none());
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn every_formula_divisor_is_checked_for_each_kind() {
        for kind in ExperimentKind::all() {
            for param in kind.divisor_params() {
                let mut descriptor = kind.descriptor();
                let spec = descriptor
                    .control_params
                    .iter_mut()
                    .find(|p| p.id == *param)
                    .unwrap();
                spec.divisor = false;
                spec.min = 0.5;
                spec.default = spec.default.max(0.5);
                assert!(
                    matches!(
                        descriptor.validate(),
                        Err(DescriptorError::DivisorBelowOne { .. })
                    ),
                    "{}.{} accepted with min 0.5",
                    kind.id(),
                    param
                );
            }
        }
    }
}
