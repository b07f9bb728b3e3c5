pub(crate) mod recovery;
