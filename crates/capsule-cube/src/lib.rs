//! # capsule-cube
//!
//! Read access to the pre-aggregated session datacube.
//!
//! The datacube is a directory of consolidated parquet files, one per logical
//! component (`units`, `session`, ...), under
//! `<datacube>/consolidated/<component>.parquet`. Queries run through an
//! in-memory `DuckDB` connection that scans the parquet files directly, so
//! only the filtered and sampled rows are materialised.
//!
//! ```no_run
//! use capsule_cube::{Datacube, DatacubeLocator};
//!
//! let cube = Datacube::open(DatacubeLocator::new(["/data", "/tmp/data"])).expect("cube");
//! let frame = cube
//!     .component("units")
//!     .expect("units component")
//!     .filter_eq("session_id", "620263_2022-07-26")
//!     .filter_eq("structure", "MOp")
//!     .sample(10)
//!     .sort_by("activity_drift")
//!     .collect()
//!     .expect("query");
//! println!("{} rows", frame.len());
//! ```

pub mod error;
pub mod locator;
pub mod query;

pub use error::CubeError;
pub use locator::DatacubeLocator;
pub use query::{ComponentQuery, Frame};

use duckdb::Connection;

/// Handle on the datacube: a locator plus a query connection.
pub struct Datacube {
    conn: Connection,
    locator: DatacubeLocator,
}

impl Datacube {
    /// Open an in-memory query connection over the datacube `locator` finds.
    ///
    /// Nothing on disk is touched until a component is requested.
    ///
    /// # Errors
    ///
    /// Returns [`CubeError::DuckDb`] if the connection cannot be opened.
    pub fn open(locator: DatacubeLocator) -> Result<Self, CubeError> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn, locator })
    }

    #[must_use]
    pub const fn locator(&self) -> &DatacubeLocator {
        &self.locator
    }

    /// Access the underlying `DuckDB` connection.
    #[must_use]
    pub const fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Start a lazy query over a consolidated component.
    ///
    /// # Errors
    ///
    /// Returns [`CubeError::ComponentNotFound`] if the component has no
    /// parquet file, or a locator error if the datacube cannot be found.
    pub fn component(&self, component: &str) -> Result<ComponentQuery<'_>, CubeError> {
        let path = self.locator.component_path(component)?;
        if !path.is_file() {
            return Err(CubeError::ComponentNotFound {
                component: component.to_string(),
                path,
            });
        }
        Ok(ComponentQuery::new(&self.conn, path))
    }

    /// Read a whole component into memory.
    ///
    /// # Errors
    ///
    /// See [`Datacube::component`] and [`ComponentQuery::collect`].
    pub fn frame(&self, component: &str) -> Result<Frame, CubeError> {
        self.component(component)?.collect()
    }
}
