pub mod constants;

#[cfg(test)]
pub mod test_support;
