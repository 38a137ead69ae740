//! Case targets: where a set of socket values ends up.

use std::collections::BTreeSet;

use serde_json::{json, Value};

use crate::error::ValidationError;
use crate::http::ApiRequest;
use crate::sockets::{ResolvedValue, Socket, SocketCatalog};

/// Kind of case, used for logging and metrics labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaseKind {
    ArchiveItem,
    DisplaySet,
    AlgorithmJob,
}

impl CaseKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaseKind::ArchiveItem => "archive_item",
            CaseKind::DisplaySet => "display_set",
            CaseKind::AlgorithmJob => "algorithm_job",
        }
    }
}

/// One accepted combination of algorithm input sockets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlgorithmInterface {
    pub inputs: Vec<Socket>,
}

impl AlgorithmInterface {
    pub fn new(inputs: Vec<Socket>) -> Self {
        Self { inputs }
    }

    fn slugs(&self) -> BTreeSet<&str> {
        self.inputs.iter().map(|s| s.slug.as_str()).collect()
    }
}

/// Creation or update endpoint for a case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// Create an item in the archive with this API URL.
    NewArchiveItem { archive: String },
    /// Add values to an existing archive item.
    ArchiveItem { pk: String },
    /// Create a display set in the reader study with this API URL.
    NewDisplaySet { reader_study: String },
    /// Add values to an existing display set.
    DisplaySet { pk: String },
    /// Start a job of the algorithm with this API URL.
    AlgorithmJob {
        algorithm: String,
        interfaces: Vec<AlgorithmInterface>,
    },
}

/// A destination together with the sockets it accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseTarget {
    pub destination: Destination,
    pub catalog: SocketCatalog,
}

impl CaseTarget {
    pub fn new_archive_item(archive: impl Into<String>, catalog: SocketCatalog) -> Self {
        Self {
            destination: Destination::NewArchiveItem {
                archive: archive.into(),
            },
            catalog,
        }
    }

    pub fn archive_item(pk: impl Into<String>, catalog: SocketCatalog) -> Self {
        Self {
            destination: Destination::ArchiveItem { pk: pk.into() },
            catalog,
        }
    }

    pub fn new_display_set(reader_study: impl Into<String>, catalog: SocketCatalog) -> Self {
        Self {
            destination: Destination::NewDisplaySet {
                reader_study: reader_study.into(),
            },
            catalog,
        }
    }

    pub fn display_set(pk: impl Into<String>, catalog: SocketCatalog) -> Self {
        Self {
            destination: Destination::DisplaySet { pk: pk.into() },
            catalog,
        }
    }

    /// Job target; the catalog is the union of every interface's inputs.
    pub fn algorithm_job(algorithm: impl Into<String>, interfaces: Vec<AlgorithmInterface>) -> Self {
        let catalog = SocketCatalog::new(
            interfaces
                .iter()
                .flat_map(|interface| interface.inputs.iter().cloned()),
        );
        Self {
            destination: Destination::AlgorithmJob {
                algorithm: algorithm.into(),
                interfaces,
            },
            catalog,
        }
    }

    pub fn kind(&self) -> CaseKind {
        match self.destination {
            Destination::NewArchiveItem { .. } | Destination::ArchiveItem { .. } => {
                CaseKind::ArchiveItem
            }
            Destination::NewDisplaySet { .. } | Destination::DisplaySet { .. } => {
                CaseKind::DisplaySet
            }
            Destination::AlgorithmJob { .. } => CaseKind::AlgorithmJob,
        }
    }

    /// Whether finalizing creates a new case (as opposed to updating one).
    pub fn creates(&self) -> bool {
        !matches!(
            self.destination,
            Destination::ArchiveItem { .. } | Destination::DisplaySet { .. }
        )
    }

    /// Check that `slugs` is an acceptable set of sockets for this target.
    ///
    /// Every slug must be in the catalog and appear once. New cases must
    /// carry every required socket; jobs must cover every input of some
    /// interface, checked in order.
    pub fn check_sockets<'a>(
        &self,
        slugs: impl IntoIterator<Item = &'a str>,
    ) -> Result<(), ValidationError> {
        let mut given = BTreeSet::new();
        for slug in slugs {
            if !self.catalog.contains(slug) {
                return Err(ValidationError::UnknownSocket(slug.to_string()));
            }
            if !given.insert(slug) {
                return Err(ValidationError::DuplicateSocket(slug.to_string()));
            }
        }

        if let Destination::AlgorithmJob { interfaces, .. } = &self.destination {
            return match_interface(interfaces, &given);
        }

        if self.creates() {
            if let Some(missing) = self.catalog.required_slugs().find(|s| !given.contains(s)) {
                return Err(ValidationError::MissingSocket(missing.to_string()));
            }
        }

        Ok(())
    }

    /// The single request that creates or updates the case.
    pub fn finalize_request(&self, values: &[ResolvedValue]) -> ApiRequest {
        let values: Vec<Value> = values.iter().map(ResolvedValue::to_post).collect();
        match &self.destination {
            Destination::NewArchiveItem { archive } => ApiRequest::post(
                "archives/items/",
                json!({ "archive": archive, "values": values }),
            ),
            Destination::ArchiveItem { pk } => {
                ApiRequest::patch(format!("archives/items/{pk}/"), json!({ "values": values }))
            }
            Destination::NewDisplaySet { reader_study } => ApiRequest::post(
                "reader-studies/display-sets/",
                json!({ "reader_study": reader_study, "values": values }),
            ),
            Destination::DisplaySet { pk } => ApiRequest::patch(
                format!("reader-studies/display-sets/{pk}/"),
                json!({ "values": values }),
            ),
            Destination::AlgorithmJob { algorithm, .. } => ApiRequest::post(
                "algorithms/jobs/",
                json!({ "algorithm": algorithm, "inputs": values }),
            ),
        }
    }
}

fn match_interface(
    interfaces: &[AlgorithmInterface],
    given: &BTreeSet<&str>,
) -> Result<(), ValidationError> {
    let mut closest: Option<(usize, &AlgorithmInterface)> = None;
    for interface in interfaces {
        let expected = interface.slugs();
        if expected.is_subset(given) {
            return Ok(());
        }
        let overlap = expected.intersection(given).count();
        if overlap > 0 && closest.map_or(true, |(best, _)| overlap > best) {
            closest = Some((overlap, interface));
        }
    }

    Err(ValidationError::NoMatchingInterface {
        given: given.iter().map(|s| s.to_string()).collect(),
        closest: closest.map(|(_, interface)| {
            interface.slugs().into_iter().map(String::from).collect()
        }),
    })
}
