mod avg_impl;
mod count_impl;
mod listagg_impl;
mod minmax_impl;
mod sum_impl;

pub use avg_impl::AvgImpl;
pub use count_impl::CountImpl;
pub use listagg_impl::list_agg;
pub use minmax_impl::{MaxImpl, MinImpl};
pub use sum_impl::SumImpl;
