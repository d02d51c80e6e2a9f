//! End-to-end scenarios for the `tide-predict` binary: station records in,
//! printed lines out.
