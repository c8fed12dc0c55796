mod residuals;
mod spoofing;
mod state;
mod uncertainty;
mod velocity;
mod wls;

pub use residuals::SolutionResidualSet;
pub use spoofing::{SpoofingReport, SpoofingResidualFilter};
pub use state::ReceiverState;
pub use uncertainty::EnuUncertainty;
pub use wls::{WeightedLeastSquaresSolver, WlsSolution};
