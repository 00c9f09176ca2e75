//! Frozen class-hierarchy snapshot and symbol-resolution reporting.
//!
//! The engine never loads classes itself. Subtype queries run against a
//! [`ClassHierarchy`] snapshot assembled by the caller and frozen for the
//! duration of an analysis; classes the snapshot does not know are reported
//! through the [`LookupFailureCallback`] and treated conservatively (the
//! query answers "no"), never as a crash.

use std::collections::{HashMap, HashSet};

/// Receives reports of symbolic references that could not be resolved.
///
/// Lookup failures degrade precision — a subtype match fails, a field access
/// becomes opaque — but never abort an analysis. The callback exists so a
/// driver can log them for later diagnostics.
pub trait LookupFailureCallback {
    /// Reports that a class could not be found.
    fn report_missing_class(&self, class_name: &str);
}

/// A no-op callback for callers that do not collect diagnostics.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentLookupFailureCallback;

impl LookupFailureCallback for SilentLookupFailureCallback {
    fn report_missing_class(&self, _class_name: &str) {}
}

/// An immutable class-hierarchy snapshot.
///
/// Maps each class to its superclass and directly implemented interfaces.
/// Built once by the caller, then shared read-only across analyses.
#[derive(Debug, Default, Clone)]
pub struct ClassHierarchy {
    /// class -> (superclass, interfaces)
    classes: HashMap<String, (Option<String>, Vec<String>)>,
}

impl ClassHierarchy {
    /// Creates an empty hierarchy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a class with its superclass and interfaces.
    ///
    /// # Arguments
    ///
    /// * `class_name` - The class being recorded
    /// * `superclass` - Its superclass, or `None` for the root
    /// * `interfaces` - Directly implemented interface names
    pub fn add_class(
        &mut self,
        class_name: &str,
        superclass: Option<&str>,
        interfaces: &[&str],
    ) {
        self.classes.insert(
            class_name.to_owned(),
            (
                superclass.map(str::to_owned),
                interfaces.iter().map(|&i| i.to_owned()).collect(),
            ),
        );
    }

    /// Returns `true` if the class is known to the snapshot.
    #[must_use]
    pub fn contains(&self, class_name: &str) -> bool {
        self.classes.contains_key(class_name)
    }

    /// Answers "is `sub` a subtype of `sup`" against the snapshot.
    ///
    /// Every class is a subtype of itself. Classes missing from the
    /// snapshot are reported through the callback and the answer degrades
    /// to `false`.
    ///
    /// # Arguments
    ///
    /// * `sub` - The candidate subtype
    /// * `sup` - The candidate supertype
    /// * `callback` - Receives missing-class reports
    pub fn is_subtype(
        &self,
        sub: &str,
        sup: &str,
        callback: &dyn LookupFailureCallback,
    ) -> bool {
        if sub == sup {
            return true;
        }

        let mut seen: HashSet<&str> = HashSet::new();
        let mut work: Vec<&str> = vec![sub];
        while let Some(current) = work.pop() {
            if !seen.insert(current) {
                continue;
            }
            if current == sup {
                return true;
            }
            match self.classes.get(current) {
                Some((superclass, interfaces)) => {
                    if let Some(superclass) = superclass {
                        work.push(superclass);
                    }
                    work.extend(interfaces.iter().map(String::as_str));
                }
                None => {
                    callback.report_missing_class(current);
                }
            }
        }
        false
    }
}
