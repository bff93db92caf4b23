pub mod fixtures;


#[cfg(test)]
mod lifecycle;
