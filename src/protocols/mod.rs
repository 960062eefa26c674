pub mod grpc;

pub use grpc::RpcChannel;
