pub mod sepay;
