//! Check a set of bindings before any component is built.

use std::collections::{HashMap, HashSet};

use tracing::{trace, warn};

use crate::key::Key;
use crate::resolve::{Provider, Result, WiringError};

/// Check that every dependency is bound and that direct dependencies do not form a cycle.
///
/// Deferred dependencies must be bound but are not followed.
/// Components are visited in the given order and the first problem found is reported.
pub(crate) fn validate(order: &[Key], providers: &HashMap<Key, Provider>) -> Result<()> {
    let mut checked = HashSet::new();
    for component in order {
        if checked.contains(component) {
            continue;
        }
        let Some(provider) = providers.get(component) else {
            continue;
        };
        let mut visiting = vec![component.clone()];
        visit(component, provider, providers, &mut visiting, &mut checked).map_err(|err| {
            warn!(%err, "invalid bindings");
            err
        })?;
    }
    Ok(())
}

fn visit(
    component: &Key,
    provider: &Provider,
    providers: &HashMap<Key, Provider>,
    visiting: &mut Vec<Key>,
    checked: &mut HashSet<Key>,
) -> Result<()> {
    for dependency in provider.dependencies() {
        trace!(
            %component,
            dependency = %dependency.key,
            deferred = dependency.deferred,
            "checking"
        );
        let Some(next) = providers.get(&dependency.key) else {
            return Err(WiringError::DependencyNotFound {
                component: component.clone(),
                dependency: dependency.key,
            });
        };
        if dependency.deferred || checked.contains(&dependency.key) {
            continue;
        }
        if let Some(start) = visiting.iter().position(|k| *k == dependency.key) {
            return Err(WiringError::CyclicDependency {
                components: visiting[start..].to_vec(),
            });
        }

        visiting.push(dependency.key.clone());
        visit(&dependency.key, next, providers, visiting, checked)?;
        visiting.pop();
    }
    // Everything reachable from here is bound and acyclic
    checked.insert(component.clone());
    Ok(())
}
