pub mod enumerate;
pub mod featurize;
pub mod fit;
pub mod histogram;
