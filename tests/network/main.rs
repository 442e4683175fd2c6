mod mock;

#[cfg(feature = "std")]
mod live;
mod reassembly;
