//! Resolving the one merge method a run will use.

use splitfetch_schema::MergeStrategy;

use crate::Error;
use crate::probe::MethodStatus;

/// Asks someone to pick among the available methods.
///
/// Only available methods are offered. Returning `None` means the user
/// declined.
pub trait Chooser: Send + Sync {
    fn choose(&self, package: &str, available: &[MethodStatus]) -> Option<MergeStrategy>;
}

/// Never picks anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct Decline;

impl Chooser for Decline {
    fn choose(&self, _: &str, _: &[MethodStatus]) -> Option<MergeStrategy> {
        None
    }
}

/// Always picks the given method.
#[derive(Debug, Clone, Copy)]
pub struct Fixed(pub MergeStrategy);

impl Chooser for Fixed {
    fn choose(&self, _: &str, _: &[MethodStatus]) -> Option<MergeStrategy> {
        Some(self.0)
    }
}

/// Pick a method from a fresh enumeration.
///
/// An explicit method wins over the chooser but must be available. With
/// nothing available the result is [`Error::NoStrategyAvailable`], which
/// callers treat as a setup problem; a declining chooser gives
/// [`Error::UserDeclined`].
pub fn select(
    methods: &[MethodStatus],
    explicit: Option<MergeStrategy>,
    chooser: &dyn Chooser,
    package: &str,
) -> Result<MergeStrategy, Error> {
    let available: Vec<MethodStatus> = methods.iter().filter(|m| m.available).cloned().collect();

    if let Some(strategy) = explicit {
        return match methods.iter().find(|m| m.strategy == strategy) {
            Some(m) if m.available => Ok(strategy),
            Some(m) => Err(Error::NoStrategyAvailable {
                strategy: Some(strategy),
                reason: m.status.clone(),
            }),
            None => Err(Error::NoStrategyAvailable {
                strategy: Some(strategy),
                reason: "not probed".into(),
            }),
        };
    }

    if available.is_empty() {
        let reason = methods
            .iter()
            .map(|m| format!("{}: {}", m.strategy.slug(), m.status))
            .collect::<Vec<_>>()
            .join("; ");
        return Err(Error::NoStrategyAvailable {
            strategy: None,
            reason,
        });
    }

    let chosen = chooser.choose(package, &available).ok_or(Error::UserDeclined)?;
    if available.iter().any(|m| m.strategy == chosen) {
        Ok(chosen)
    } else {
        Err(Error::NoStrategyAvailable {
            strategy: Some(chosen),
            reason: "not offered".into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn methods(available: &[MergeStrategy]) -> Vec<MethodStatus> {
        MergeStrategy::ALL
            .iter()
            .map(|&strategy| MethodStatus {
                strategy,
                available: available.contains(&strategy),
                status: if available.contains(&strategy) {
                    "Ready".into()
                } else {
                    "Missing".into()
                },
            })
            .collect()
    }

    #[test]
    fn test_explicit_available() {
        let m = methods(&[MergeStrategy::XapkBundle]);
        let got = select(&m, Some(MergeStrategy::XapkBundle), &Decline, "pkg").unwrap();
        assert_eq!(got, MergeStrategy::XapkBundle);
    }

    #[test]
    fn test_explicit_unavailable_is_setup_problem() {
        let m = methods(&[MergeStrategy::XapkBundle, MergeStrategy::ApksBundle]);
        let err = select(&m, MergeStrategy::from_id(5), &Fixed(MergeStrategy::XapkBundle), "pkg")
            .unwrap_err();
        assert!(matches!(
            err,
            Error::NoStrategyAvailable {
                strategy: Some(MergeStrategy::FullMergeSign),
                ..
            }
        ));
    }

    #[test]
    fn test_nothing_available_differs_from_declining() {
        let none = methods(&[]);
        let err = select(&none, None, &Fixed(MergeStrategy::XapkBundle), "pkg").unwrap_err();
        assert!(err.is_setup_problem());

        let some = methods(&[MergeStrategy::ApksBundle]);
        let err = select(&some, None, &Decline, "pkg").unwrap_err();
        assert!(matches!(err, Error::UserDeclined));
    }

    #[test]
    fn test_chooser_cannot_escape_available_set() {
        let m = methods(&[MergeStrategy::ApksBundle]);
        assert_eq!(
            select(&m, None, &Fixed(MergeStrategy::ApksBundle), "pkg").unwrap(),
            MergeStrategy::ApksBundle
        );
        let err = select(&m, None, &Fixed(MergeStrategy::AdbInstall), "pkg").unwrap_err();
        assert!(err.is_setup_problem());
    }
}
