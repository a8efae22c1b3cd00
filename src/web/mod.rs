//! Read-store web server.
//!
//! Serves the readsets loaded from a data directory over the JSON API the
//! viewer client speaks.
//!
//! ## Starting the Server
//!
//! ```text
//! # Start on default port 8080
//! readgraph serve data/
//!
//! # Custom port, page size and SNP table
//! readgraph serve data/ --port 3000 --page-size 500 --snps snps.tsv
//!
//! # Bind to all interfaces
//! readgraph serve data/ --address 0.0.0.0
//! ```
//!
//! ## API Endpoints
//!
//! - `GET /api/reads` - One page of reads (`type=reads`) or coverage (`type=coverage`)
//! - `GET /api/readsets` - Readsets, or one readset with its reference sequences
//! - `GET /api/snps?snp=<id>` - Location of a SNP
//! - `GET /api/health` - Liveness and readset count

pub mod server;
