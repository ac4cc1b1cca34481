//! Per-client processing pipeline.
//!
//! A run flows through these pieces, leaf first:
//!
//! 1. [`StatisticsAggregator`] collects counters for one run
//! 2. [`TransformationStage`] implementations mutate rows
//! 3. [`StageChain`] runs applicable stages in order
//! 4. [`StrategyRegistry`] picks the chain for a client
//! 5. [`Orchestrator`] validates input, times the run and builds the envelope
//! 6. [`LifecycleTracker`] moves the file record through its status machine
//!
//! [`WorkerPool`] and [`FileProcessingService`] run many files concurrently.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use zoomos_core::{Orchestrator, InMemoryReferenceDirectory, build_default_registry};
//!
//! let registry = build_default_registry(Arc::new(InMemoryReferenceDirectory::new()));
//! let orchestrator = Orchestrator::new(Arc::new(registry));
//! let envelope = orchestrator.run(rows, &config);
//! ```

pub mod aggregator;
pub mod cancel;
pub mod chain;
pub mod error;
pub mod export;
pub mod lifecycle;
pub mod orchestrator;
pub mod pool;
pub mod reference;
pub mod registry;
pub mod service;
pub mod stage;
pub mod stages;
pub mod store;

pub use aggregator::StatisticsAggregator;
pub use cancel::{CancellationFlag, CancellationRegistry};
pub use chain::StageChain;
pub use error::{LifecycleError, LookupError, PipelineError, Result, StageFailure, StoreError};
pub use lifecycle::{LifecycleTracker, status_for};
pub use orchestrator::Orchestrator;
pub use pool::{DEFAULT_QUEUE_CAPACITY, PoolConfig, Submission, WorkerPool};
pub use reference::{InMemoryReferenceDirectory, ReferenceDirectory, RetailEntry};
pub use registry::{ChainBinding, StrategyRegistry, build_default_registry, default_chain};
pub use service::{FileProcessingService, FileTicket, ProcessedFile};
pub use stage::TransformationStage;
pub use store::{FileStore, InMemoryFileStore};
