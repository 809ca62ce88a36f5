// Domain-layer modules and shared errors/models
pub mod pipeline {
    pub use crate::pipeline::*;
}

pub mod entities {
    pub use crate::entities::*;
}

pub mod fields {
    pub use crate::fields::*;
}

pub mod identity {
    pub use crate::identity::*;
}

pub mod duplicates {
    pub use crate::duplicates::*;
}

pub mod models {
    pub use crate::models::*;
}

pub mod errors {
    pub use crate::errors::*;
}
