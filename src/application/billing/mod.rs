pub mod build_statement;
pub mod change_invoice_status;
pub mod create_invoice;
pub mod create_quotation;
pub mod mark_overdue_invoices;
pub mod preview_document_number;
pub mod recompute_invoice;
pub mod record_payment;
pub mod reverse_payment;

pub use build_statement::{
  BuildStatementCommand, BuildStatementResponse, BuildStatementUseCase, StatementEntryDto,
};
pub use change_invoice_status::{
  ChangeInvoiceStatusCommand, ChangeInvoiceStatusResponse, ChangeInvoiceStatusUseCase,
};
pub use create_invoice::{
  CreateInvoiceCommand, CreateInvoiceResponse, CreateInvoiceUseCase, InvoiceItemDto,
};
pub use create_quotation::{
  CreateQuotationCommand, CreateQuotationResponse, CreateQuotationUseCase, QuotationItemDto,
};
pub use mark_overdue_invoices::{
  MarkOverdueInvoicesCommand, MarkOverdueInvoicesResponse, MarkOverdueInvoicesUseCase,
};
pub use preview_document_number::{
  PreviewDocumentNumberCommand, PreviewDocumentNumberResponse, PreviewDocumentNumberUseCase,
};
pub use recompute_invoice::{
  RecomputeInvoiceCommand, RecomputeInvoiceResponse, RecomputeInvoiceUseCase,
};
pub use record_payment::{RecordPaymentCommand, RecordPaymentResponse, RecordPaymentUseCase};
pub use reverse_payment::{ReversePaymentCommand, ReversePaymentResponse, ReversePaymentUseCase};
