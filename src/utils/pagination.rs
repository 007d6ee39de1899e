// ============================================================================
// PAGINACIÓN - Troceo en páginas de listados grandes (ingresos, gastos...)
// ============================================================================

/// Paginador en memoria. Las páginas se numeran desde 1; una lista vacía
/// tiene 0 páginas y devuelve ventanas vacías.
pub struct Pagination<T> {
    items: Vec<T>,
    items_per_page: usize,
    current_page: usize,
    total_pages: usize,
}

/// Resumen del estado de paginación para pintar los controles
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageInfo {
    pub current_page: usize,
    pub total_pages: usize,
    pub items_per_page: usize,
    pub total_items: usize,
    /// Índice 1-based del primer elemento visible
    pub start_item: usize,
    /// Índice 1-based del último elemento visible
    pub end_item: usize,
    pub has_next_page: bool,
    pub has_previous_page: bool,
}

impl<T> Pagination<T> {
    pub fn new(items: Vec<T>, items_per_page: usize) -> Self {
        // items_per_page 0 no tiene sentido; se normaliza a 1
        let items_per_page = items_per_page.max(1);
        let total_pages = items.len().div_ceil(items_per_page);
        Self {
            items,
            items_per_page,
            current_page: 1,
            total_pages,
        }
    }

    /// Reemplaza los elementos y recalcula; si la página actual queda fuera
    /// de rango vuelve a la primera
    pub fn set_items(&mut self, items: Vec<T>) {
        self.items = items;
        self.total_pages = self.items.len().div_ceil(self.items_per_page);
        if self.current_page > self.total_pages {
            self.current_page = 1;
        }
    }

    pub fn current_page_items(&self) -> &[T] {
        let start = (self.current_page - 1) * self.items_per_page;
        if start >= self.items.len() {
            return &[];
        }
        let end = (start + self.items_per_page).min(self.items.len());
        &self.items[start..end]
    }

    /// Salta a una página concreta; fuera de rango no cambia nada
    pub fn go_to_page(&mut self, page: usize) -> Option<&[T]> {
        if page >= 1 && page <= self.total_pages {
            self.current_page = page;
            Some(self.current_page_items())
        } else {
            None
        }
    }

    pub fn next_page(&mut self) -> Option<&[T]> {
        self.go_to_page(self.current_page + 1)
    }

    pub fn previous_page(&mut self) -> Option<&[T]> {
        match self.current_page.checked_sub(1) {
            Some(page) => self.go_to_page(page),
            None => None,
        }
    }

    pub fn first_page(&mut self) -> Option<&[T]> {
        self.go_to_page(1)
    }

    pub fn last_page(&mut self) -> Option<&[T]> {
        self.go_to_page(self.total_pages)
    }

    pub fn is_first_page(&self) -> bool {
        self.current_page == 1
    }

    pub fn is_last_page(&self) -> bool {
        self.current_page == self.total_pages
    }

    /// Cambia el tamaño de página y vuelve a la primera
    pub fn set_items_per_page(&mut self, count: usize) {
        self.items_per_page = count.max(1);
        self.total_pages = self.items.len().div_ceil(self.items_per_page);
        self.current_page = 1;
    }

    pub fn info(&self) -> PageInfo {
        let start = (self.current_page - 1) * self.items_per_page + 1;
        let end = (self.current_page * self.items_per_page).min(self.items.len());
        PageInfo {
            current_page: self.current_page,
            total_pages: self.total_pages,
            items_per_page: self.items_per_page,
            total_items: self.items.len(),
            start_item: start,
            end_item: end,
            has_next_page: self.current_page < self.total_pages,
            has_previous_page: self.current_page > 1,
        }
    }
}
