//! Generated client stubs for the vendored `walletrpc.WalletService` subset
//! in `proto/api.proto`.
tonic::include_proto!("walletrpc");
