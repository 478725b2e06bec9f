pub mod pagseguro;
